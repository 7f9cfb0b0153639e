//! Wire protocol for Stronghold.
//!
//! This crate defines how typed messages become bytes and back:
//!
//! - **Contract** ([`Message`]): a numeric type id plus an ordered field
//!   layout, read and written by each concrete message.
//! - **Cursor types** ([`MessageReader`], [`MessageWriter`]): big-endian
//!   primitives: `i32`, length-prefixed text, second-count durations and
//!   millisecond-text timestamps.
//! - **Codec** ([`MessageCodec`]): frames a message as
//!   `[u16 type id][fields]`.
//! - **Messages** ([`LoginSuccessMessage`]).
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! The protocol layer knows nothing about avatars or storage. Mapping an
//! avatar onto a message's fields is done by the caller.
//!
//! ```text
//! Transport (frames) → Protocol (typed messages) → Login flow (avatars)
//! ```

mod codec;
mod error;
mod login_success;
mod reader;
mod writer;

pub use codec::{Message, MessageCodec};
pub use error::ProtocolError;
pub use login_success::LoginSuccessMessage;
pub use reader::MessageReader;
pub use writer::MessageWriter;
