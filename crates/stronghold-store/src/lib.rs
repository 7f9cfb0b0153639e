//! Token-keyed avatar persistence for Stronghold.
//!
//! An [`AvatarStore`] owns a directory with one record per avatar and is
//! shared between connection tasks behind an `Arc`.
//!
//! # Key types
//!
//! - [`AvatarStore`]: create, load, save and look up avatars by token
//! - [`StoreConfig`]: where records live and how long I/O may take
//! - [`NewAvatarDefaults`]: what a freshly created avatar starts with
//! - [`StoreError`]: every way a store operation can fail
//!
//! # Example
//!
//! ```no_run
//! use stronghold_avatar::Village;
//! use stronghold_store::{AvatarStore, StoreConfig};
//!
//! # async fn run() -> Result<(), stronghold_store::StoreError> {
//! let store = AvatarStore::open(StoreConfig::new("avatars"), Village::empty()).await?;
//! let avatar = store.create(None, None).await?;
//! let token = avatar.require_token()?.clone();
//! assert!(store.exists(token.as_str()).await);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod record;
mod store;

pub use config::{NewAvatarDefaults, StoreConfig};
pub use error::StoreError;
pub use store::{load_template, AvatarStore};
