//! Error types for the store layer.

use std::io;

use stronghold_avatar::ValidationError;

/// Errors that can occur while creating, loading or saving avatars.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A supplied value (usually a token) failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No record exists for the token.
    ///
    /// Also returned for strings that aren't valid tokens at all, so
    /// callers can't use `load` to test the token format.
    #[error("no avatar with token '{0}'")]
    NotFound(String),

    /// `create` was given a token that is already in use.
    #[error("an avatar with token '{0}' already exists")]
    AlreadyExists(String),

    /// The record exists but can't be turned back into an avatar.
    #[error("record for '{token}' is corrupt: {reason}")]
    CorruptRecord { token: String, reason: String },

    /// The backing directory couldn't be reached, or an operation on it
    /// timed out.
    #[error("storage unavailable during {op}: {source}")]
    StorageUnavailable {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    /// The store configuration can't be used.
    #[error("invalid store config: {0}")]
    Config(String),

    /// The starting-village template couldn't be read or parsed.
    #[error("invalid starting village template: {0}")]
    Template(String),
}

impl StoreError {
    pub(crate) fn corrupt(token: impl ToString, reason: impl ToString) -> Self {
        Self::CorruptRecord {
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unavailable(op: &'static str, source: io::Error) -> Self {
        Self::StorageUnavailable { op, source }
    }

    /// Returns `true` if the failure is about one avatar only (missing,
    /// corrupt, invalid) rather than the store as a whole.
    pub fn is_per_avatar(&self) -> bool {
        !matches!(
            self,
            Self::StorageUnavailable { .. } | Self::Config(_) | Self::Template(_)
        )
    }
}
