//! The message contract and the frame codec.
//!
//! Every wire message implements [`Message`]: a constant type identifier
//! plus a pair of functions that read and write its fields in one fixed
//! order. [`MessageCodec`] wraps a message in its frame,
//! `[u16 type id][fields]`, and unwraps it again.
//!
//! There's no shared length or checksum at this layer. Framing the byte
//! stream into individual frames is the transport's job; by the time a
//! frame reaches [`MessageCodec::decode`] it is exactly one message.

use crate::{MessageReader, MessageWriter, ProtocolError};

/// A typed protocol message with a fixed field layout.
///
/// `read_message` and `write_message` must visit the same fields in the
/// same order. Nothing may be skipped or defaulted on the read side: a
/// missing field is a decode failure.
pub trait Message: Sized + Send + Sync + 'static {
    /// Numeric type identifier used to dispatch incoming frames.
    const ID: u16;

    /// Reads every declared field, in order, from `reader`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Malformed`] if a field is truncated or
    /// invalid.
    fn read_message(
        reader: &mut MessageReader<'_>,
    ) -> Result<Self, ProtocolError>;

    /// Writes every declared field, in order, to `writer`.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encoding`] if a field value is outside
    /// what the wire format can carry.
    fn write_message(
        &self,
        writer: &mut MessageWriter,
    ) -> Result<(), ProtocolError>;
}

/// Encodes messages into frames and decodes frames into messages.
///
/// ```rust
/// use stronghold_protocol::{LoginSuccessMessage, MessageCodec, Message};
///
/// let codec = MessageCodec;
/// let msg = LoginSuccessMessage::default();
///
/// let frame = codec.encode(&msg).unwrap();
/// assert_eq!(codec.peek_id(&frame).unwrap(), LoginSuccessMessage::ID);
///
/// let decoded: LoginSuccessMessage = codec.decode(&frame).unwrap();
/// assert_eq!(decoded, msg);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec;

impl MessageCodec {
    /// Encodes `message` as a full frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encoding`] if any field is out of contract.
    /// Nothing is returned in that case, so a half-written frame can never
    /// leak to the transport.
    pub fn encode<M: Message>(
        &self,
        message: &M,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut writer = MessageWriter::with_capacity(64);
        writer.write_u16(M::ID);
        message.write_message(&mut writer)?;
        tracing::trace!(id = M::ID, len = writer.len(), "encoded message");
        Ok(writer.into_vec())
    }

    /// Decodes a full frame as message type `M`.
    ///
    /// # Errors
    /// - [`ProtocolError::UnexpectedMessageId`] if the frame is for a
    ///   different message type
    /// - [`ProtocolError::Malformed`] if the frame is truncated, a field is
    ///   invalid, or bytes are left over after the last field
    pub fn decode<M: Message>(&self, frame: &[u8]) -> Result<M, ProtocolError> {
        let mut reader = MessageReader::new(frame);
        let id = reader.read_u16()?;
        if id != M::ID {
            return Err(ProtocolError::UnexpectedMessageId {
                expected: M::ID,
                actual: id,
            });
        }
        let message = M::read_message(&mut reader)?;
        reader.finish()?;
        tracing::trace!(id, len = frame.len(), "decoded message");
        Ok(message)
    }

    /// Returns the type identifier of a frame without decoding its body.
    ///
    /// This is what a demultiplexer uses to choose which `decode::<M>` to
    /// call.
    pub fn peek_id(&self, frame: &[u8]) -> Result<u16, ProtocolError> {
        MessageReader::new(frame).read_u16()
    }
}
