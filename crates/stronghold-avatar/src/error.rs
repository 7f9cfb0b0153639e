//! Error types for the avatar layer.

/// A value was rejected before it could be stored on an avatar.
///
/// Setters on [`Avatar`](crate::Avatar) return this instead of applying an
/// invalid value, so the avatar is never left in a state the client
/// can't handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The string doesn't match the token alphabet and length.
    #[error("'{0}' is not a valid token")]
    InvalidToken(String),

    /// The avatar was never given a token, so it can't be addressed.
    #[error("avatar has no token")]
    MissingToken,

    /// Levels start at 1; the client faults on anything lower.
    #[error("level {0} is below the minimum of 1")]
    LevelOutOfRange(i32),
}
