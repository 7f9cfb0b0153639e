//! Error types for the protocol layer.
//!
//! Each crate in Stronghold defines its own error enum. A `ProtocolError`
//! always means the problem is in turning bytes into a message or a message
//! into bytes, never in storage or avatar validation.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame could not be decoded.
    ///
    /// Raised when the stream ends before every declared field has been
    /// read, when a length prefix points past the end of the stream, or
    /// when a field's bytes don't form a valid value (bad UTF-8, a
    /// timestamp that isn't an integer, trailing bytes after the last
    /// field).
    #[error("malformed message at byte {offset}: {reason}")]
    Malformed {
        /// Offset of the field that failed, relative to the frame start.
        offset: usize,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// The frame carries a different type identifier than the message
    /// type the caller asked to decode.
    #[error("unexpected message id: expected {expected}, got {actual}")]
    UnexpectedMessageId { expected: u16, actual: u16 },

    /// A field value can't be represented on the wire.
    ///
    /// For example a text value longer than `i32::MAX` bytes, a duration
    /// with a fractional second, or an id that doesn't fit in 32 bits.
    #[error("encode failed: {0}")]
    Encoding(String),
}

impl ProtocolError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised while decoding a frame.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::UnexpectedMessageId { .. }
        )
    }
}
