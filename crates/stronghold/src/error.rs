//! Unified error type for Stronghold.

use stronghold_avatar::ValidationError;
use stronghold_protocol::ProtocolError;
use stronghold_store::StoreError;

/// Top-level error wrapping the errors of every layer.
///
/// The `#[from]` conversions let `?` lift sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum StrongholdError {
    /// Encoding or decoding a wire message failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An avatar field or token failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What a client is told when a request fails.
///
/// Coarser than [`StrongholdError`]: the client never learns why a token
/// was rejected, only that no avatar answers to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// No avatar for that token, whether or not the token was well formed.
    NotFound,
    /// The requested token is taken.
    AlreadyExists,
    /// The client sent a frame that couldn't be decoded.
    BadRequest,
    /// Storage is down or slow; the client may retry.
    Unavailable,
    /// Anything else. Details stay in the server log.
    Internal,
}

impl StrongholdError {
    /// Maps the error onto the code reported to the client.
    pub fn client_code(&self) -> ClientCode {
        match self {
            Self::Validation(
                ValidationError::InvalidToken(_) | ValidationError::MissingToken,
            )
            | Self::Store(StoreError::NotFound(_))
            | Self::Store(StoreError::Validation(
                ValidationError::InvalidToken(_) | ValidationError::MissingToken,
            )) => ClientCode::NotFound,
            Self::Store(StoreError::AlreadyExists(_)) => ClientCode::AlreadyExists,
            Self::Store(StoreError::StorageUnavailable { .. }) => {
                ClientCode::Unavailable
            }
            Self::Protocol(e) if e.is_decode_error() => ClientCode::BadRequest,
            _ => ClientCode::Internal,
        }
    }
}
