//! Cursor over an incoming frame.
//!
//! [`MessageReader`] hands out the primitive field kinds the protocol uses,
//! one at a time, strictly in the order the caller asks for them. There are
//! no defaults: if the bytes for a field aren't there, the read fails.
//!
//! Every read is all-or-nothing. The field is parsed from a copy of the
//! cursor and the copy is only committed once the whole value has been
//! read and validated, so a failed read leaves the reader exactly where it
//! was before the call.

use bytes::Buf;
use chrono::{DateTime, TimeDelta, Utc};

use crate::ProtocolError;

/// Length prefix value that marks an absent text field.
pub(crate) const NULL_TEXT_LEN: i32 = -1;

/// Reads big-endian fields from a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct MessageReader<'a> {
    buf: &'a [u8],
    len: usize,
}

impl<'a> MessageReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: data,
            len: data.len(),
        }
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.len - self.buf.len()
    }

    /// Number of bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Reads an unsigned 16-bit integer (used for the frame's type id).
    pub fn read_u16(&mut self) -> Result<u16, ProtocolError> {
        self.field(|buf| {
            need(buf, 2, "u16")?;
            Ok(buf.get_u16())
        })
    }

    /// Reads a fixed-width signed 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        self.field(take_i32)
    }

    /// Reads a 64-bit identifier carried in a 32-bit field.
    pub fn read_id(&mut self) -> Result<i64, ProtocolError> {
        self.field(take_i32).map(i64::from)
    }

    /// Reads a length-prefixed text value that must be present.
    ///
    /// A null marker (length `-1`) is rejected here; use
    /// [`read_nullable_string`](Self::read_nullable_string) for fields the
    /// protocol allows to be absent.
    pub fn read_string(&mut self) -> Result<String, ProtocolError> {
        self.field(|buf| {
            take_text(buf)?.ok_or_else(|| "null text in non-nullable field".into())
        })
    }

    /// Reads a length-prefixed text value that may be absent.
    pub fn read_nullable_string(
        &mut self,
    ) -> Result<Option<String>, ProtocolError> {
        self.field(take_text)
    }

    /// Reads a duration stored as a plain count of seconds.
    pub fn read_duration(&mut self) -> Result<TimeDelta, ProtocolError> {
        self.field(|buf| {
            let secs = take_i32(buf)?;
            Ok(TimeDelta::seconds(i64::from(secs)))
        })
    }

    /// Reads a timestamp stored as text holding milliseconds since the
    /// Unix epoch.
    ///
    /// Only the canonical decimal form is accepted (no `+` sign, no leading
    /// zeros, no fraction) so that re-encoding reproduces the same bytes.
    /// Instants before the epoch carry a leading `-`.
    pub fn read_timestamp(&mut self) -> Result<DateTime<Utc>, ProtocolError> {
        self.field(|buf| {
            let text = take_text(buf)?
                .ok_or_else(|| String::from("null text in timestamp field"))?;
            let millis: i64 = text
                .parse()
                .map_err(|_| format!("timestamp {text:?} is not an integer"))?;
            if millis.to_string() != text {
                return Err(format!("timestamp {text:?} is not canonical"));
            }
            DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| format!("timestamp {millis} is out of range"))
        })
    }

    /// Checks that every byte of the frame was consumed.
    pub fn finish(self) -> Result<(), ProtocolError> {
        if self.buf.has_remaining() {
            return Err(ProtocolError::malformed(
                self.position(),
                format!("{} trailing bytes after last field", self.remaining()),
            ));
        }
        Ok(())
    }

    /// Runs `read` against a copy of the cursor and commits only on success.
    fn field<T>(
        &mut self,
        read: impl FnOnce(&mut &'a [u8]) -> Result<T, String>,
    ) -> Result<T, ProtocolError> {
        let mut cursor = self.buf;
        match read(&mut cursor) {
            Ok(value) => {
                self.buf = cursor;
                Ok(value)
            }
            Err(reason) => {
                tracing::trace!(offset = self.position(), %reason, "field read failed");
                Err(ProtocolError::malformed(self.position(), reason))
            }
        }
    }
}

fn need(buf: &[u8], n: usize, what: &str) -> Result<(), String> {
    if buf.remaining() < n {
        return Err(format!(
            "need {n} bytes for {what}, {} remaining",
            buf.remaining()
        ));
    }
    Ok(())
}

fn take_i32(buf: &mut &[u8]) -> Result<i32, String> {
    need(buf, 4, "i32")?;
    Ok(buf.get_i32())
}

fn take_text(buf: &mut &[u8]) -> Result<Option<String>, String> {
    let declared = take_i32(buf)?;
    if declared == NULL_TEXT_LEN {
        return Ok(None);
    }
    let len = usize::try_from(declared)
        .map_err(|_| format!("negative text length {declared}"))?;
    need(buf, len, "text body")?;
    let text = std::str::from_utf8(&buf[..len])
        .map_err(|e| format!("text is not valid UTF-8: {e}"))?
        .to_owned();
    buf.advance(len);
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Vec<u8> {
        let mut out = (s.len() as i32).to_be_bytes().to_vec();
        out.extend_from_slice(s.as_bytes());
        out
    }

    // =====================================================================
    // fixed-width fields
    // =====================================================================

    #[test]
    fn test_read_i32_big_endian() {
        let mut reader = MessageReader::new(&[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(reader.read_i32().unwrap(), 258);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_read_i32_truncated_consumes_nothing() {
        let mut reader = MessageReader::new(&[0x00, 0x01, 0x02]);

        let err = reader.read_i32().unwrap_err();

        assert!(matches!(err, ProtocolError::Malformed { offset: 0, .. }));
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.remaining(), 3);
    }

    #[test]
    fn test_read_id_sign_extends() {
        let data = (-5i32).to_be_bytes();
        let mut reader = MessageReader::new(&data);
        assert_eq!(reader.read_id().unwrap(), -5);
    }

    // =====================================================================
    // text fields
    // =====================================================================

    #[test]
    fn test_read_string_returns_text() {
        let data = text("hello");
        let mut reader = MessageReader::new(&data);
        assert_eq!(reader.read_string().unwrap(), "hello");
        reader.finish().unwrap();
    }

    #[test]
    fn test_read_string_length_past_end_consumes_nothing() {
        // Declares 10 bytes but only carries 3.
        let mut data = 10i32.to_be_bytes().to_vec();
        data.extend_from_slice(b"abc");
        let mut reader = MessageReader::new(&data);

        let err = reader.read_string().unwrap_err();

        assert!(matches!(err, ProtocolError::Malformed { .. }));
        assert_eq!(reader.position(), 0, "length prefix must not be consumed");
    }

    #[test]
    fn test_read_string_null_rejected() {
        let data = NULL_TEXT_LEN.to_be_bytes();
        let mut reader = MessageReader::new(&data);
        assert!(reader.read_string().is_err());
    }

    #[test]
    fn test_read_nullable_string_null_is_none() {
        let data = NULL_TEXT_LEN.to_be_bytes();
        let mut reader = MessageReader::new(&data);
        assert_eq!(reader.read_nullable_string().unwrap(), None);
    }

    #[test]
    fn test_read_string_negative_length_rejected() {
        let data = (-7i32).to_be_bytes();
        let mut reader = MessageReader::new(&data);
        assert!(reader.read_nullable_string().is_err());
    }

    #[test]
    fn test_read_string_invalid_utf8_rejected() {
        let mut data = 2i32.to_be_bytes().to_vec();
        data.extend_from_slice(&[0xC3, 0x28]);
        let mut reader = MessageReader::new(&data);
        assert!(reader.read_string().is_err());
        assert_eq!(reader.position(), 0);
    }

    // =====================================================================
    // derived fields
    // =====================================================================

    #[test]
    fn test_read_duration_seconds() {
        let data = 90i32.to_be_bytes();
        let mut reader = MessageReader::new(&data);
        assert_eq!(reader.read_duration().unwrap(), TimeDelta::seconds(90));
    }

    #[test]
    fn test_read_timestamp_millis() {
        let data = text("1462629754000");
        let mut reader = MessageReader::new(&data);

        let ts = reader.read_timestamp().unwrap();

        assert_eq!(ts.timestamp_millis(), 1_462_629_754_000);
    }

    #[test]
    fn test_read_timestamp_non_numeric_rejected() {
        let data = text("yesterday");
        let mut reader = MessageReader::new(&data);
        assert!(reader.read_timestamp().is_err());
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn test_read_timestamp_leading_zero_rejected() {
        let data = text("01462629754000");
        let mut reader = MessageReader::new(&data);
        assert!(reader.read_timestamp().is_err());
    }

    #[test]
    fn test_read_timestamp_plus_sign_rejected() {
        let data = text("+1462629754000");
        let mut reader = MessageReader::new(&data);
        assert!(reader.read_timestamp().is_err());
    }

    #[test]
    fn test_read_timestamp_before_epoch_accepted() {
        let data = text("-5");
        let mut reader = MessageReader::new(&data);

        let ts = reader.read_timestamp().unwrap();

        assert_eq!(ts.timestamp_millis(), -5);
    }

    // =====================================================================
    // finish()
    // =====================================================================

    #[test]
    fn test_finish_with_trailing_bytes_fails() {
        let mut reader = MessageReader::new(&[0, 0, 0, 1, 0xFF]);
        reader.read_i32().unwrap();

        let err = reader.finish().unwrap_err();

        assert!(matches!(err, ProtocolError::Malformed { offset: 4, .. }));
    }
}
