//! Avatar data model and session tokens for Stronghold.
//!
//! This crate holds the in-memory side of a player:
//!
//! 1. **Tokens**: generating and validating the opaque session token
//!    ([`TokenGenerator`], [`Token`], [`TokenSource`])
//! 2. **Avatar state**: the self-validating [`Avatar`] with its slot
//!    collections ([`AvatarSlots`]) and home layout ([`Village`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Login flow (above)   ← maps avatars onto protocol messages
//!     ↕
//! Store                ← persists avatars, keyed by token
//!     ↕
//! Avatar layer (this crate)
//! ```
//!
//! Nothing here touches the disk or the network.

mod avatar;
mod error;
mod slot;
pub mod token;
mod village;

pub use avatar::{Avatar, MIN_LEVEL};
pub use error::ValidationError;
pub use slot::{AllianceUnitSlot, AvatarSlots, Slot};
pub use token::{Token, TokenGenerator, TokenSource};
pub use village::Village;
