//! Output buffer for an outgoing frame.
//!
//! [`MessageWriter`] is the mirror image of
//! [`MessageReader`](crate::MessageReader): every `read_*` method has a
//! `write_*` counterpart that produces exactly the bytes the reader
//! accepts. Fields whose value can fall outside the wire contract return a
//! `Result`; the rest can't fail.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, TimeDelta, Utc};

use crate::reader::NULL_TEXT_LEN;
use crate::ProtocolError;

/// Writes big-endian fields into a growable buffer.
#[derive(Debug, Default)]
pub struct MessageWriter {
    buf: BytesMut,
}

impl MessageWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buf.put_i32(value);
    }

    /// Writes a 64-bit identifier into a 32-bit field.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encoding`] if `id` doesn't fit in an `i32`.
    pub fn write_id(&mut self, id: i64) -> Result<(), ProtocolError> {
        let id = i32::try_from(id).map_err(|_| {
            ProtocolError::Encoding(format!("id {id} does not fit in 32 bits"))
        })?;
        self.write_i32(id);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 text value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encoding`] if the text is longer than
    /// `i32::MAX` bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), ProtocolError> {
        let len = i32::try_from(value.len()).map_err(|_| {
            ProtocolError::Encoding(format!(
                "text of {} bytes exceeds the length prefix",
                value.len()
            ))
        })?;
        self.buf.reserve(4 + value.len());
        self.buf.put_i32(len);
        self.buf.put_slice(value.as_bytes());
        Ok(())
    }

    /// Writes a text value that may be absent. `None` is written as the
    /// null length marker with no body.
    pub fn write_nullable_string(
        &mut self,
        value: Option<&str>,
    ) -> Result<(), ProtocolError> {
        match value {
            Some(text) => self.write_string(text),
            None => {
                self.buf.put_i32(NULL_TEXT_LEN);
                Ok(())
            }
        }
    }

    /// Writes a duration as a whole number of seconds.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encoding`] if the duration has a
    /// fractional second or doesn't fit in an `i32` count of seconds.
    pub fn write_duration(
        &mut self,
        value: TimeDelta,
    ) -> Result<(), ProtocolError> {
        if value.subsec_nanos() != 0 {
            return Err(ProtocolError::Encoding(format!(
                "duration {value} is not a whole number of seconds"
            )));
        }
        let secs = i32::try_from(value.num_seconds()).map_err(|_| {
            ProtocolError::Encoding(format!(
                "duration of {} seconds does not fit in 32 bits",
                value.num_seconds()
            ))
        })?;
        self.write_i32(secs);
        Ok(())
    }

    /// Writes a timestamp as decimal text of milliseconds since the Unix
    /// epoch.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encoding`] if the timestamp has
    /// sub-millisecond precision, which the wire format can't carry.
    pub fn write_timestamp(
        &mut self,
        value: &DateTime<Utc>,
    ) -> Result<(), ProtocolError> {
        if value.timestamp_subsec_nanos() % 1_000_000 != 0 {
            return Err(ProtocolError::Encoding(format!(
                "timestamp {value} has sub-millisecond precision"
            )));
        }
        self.write_string(&value.timestamp_millis().to_string())
    }

    /// Consumes the writer and returns the frozen bytes.
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Consumes the writer and returns the bytes as a `Vec`.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
