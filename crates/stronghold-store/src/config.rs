//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NewAvatarDefaults
// ---------------------------------------------------------------------------

/// Starting values for avatars made by
/// [`AvatarStore::create`](crate::AvatarStore::create).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAvatarDefaults {
    pub name: String,

    /// Starting level. Defaults to 10, which skips the tutorial.
    pub level: i32,

    pub gems: i32,
    pub free_gems: i32,

    /// Length of the protection shield granted at creation.
    pub shield: Duration,
}

impl Default for NewAvatarDefaults {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            level: 10,
            gems: 300,
            free_gems: 300,
            shield: Duration::from_secs(3 * 24 * 60 * 60),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Configuration for an [`AvatarStore`](crate::AvatarStore).
///
/// ```rust
/// use std::time::Duration;
/// use stronghold_store::StoreConfig;
///
/// let config = StoreConfig {
///     io_timeout: Duration::from_secs(2),
///     ..StoreConfig::new("/var/lib/stronghold/avatars")
/// };
/// assert_eq!(config.new_avatar.level, 10);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding one sub-directory per token.
    pub root: PathBuf,

    /// Upper bound on any single record read or write. An operation that
    /// takes longer fails with `StorageUnavailable`.
    pub io_timeout: Duration,

    pub new_avatar: NewAvatarDefaults,
}

impl StoreConfig {
    /// Default settings with records under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("avatars"),
            io_timeout: Duration::from_secs(5),
            new_avatar: NewAvatarDefaults::default(),
        }
    }
}
