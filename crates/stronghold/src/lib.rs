//! # Stronghold
//!
//! Session and persistence layer for a village-building game server.
//!
//! Stronghold ties the lower crates together: clients present an opaque
//! token, the [`LoginService`] finds (or creates) the matching avatar in
//! the [`AvatarStore`](stronghold_store::AvatarStore) and answers with an
//! encoded [`LoginSuccessMessage`](stronghold_protocol::LoginSuccessMessage).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use stronghold::prelude::*;
//!
//! # async fn run() -> Result<(), StrongholdError> {
//! stronghold::telemetry::init_tracing(stronghold::telemetry::DEFAULT_FILTER);
//!
//! let store = AvatarStore::open(StoreConfig::new("avatars"), Village::empty()).await?;
//! let logins = LoginService::new(Arc::new(store), LoginConfig::default());
//!
//! let outcome = logins.login(None).await?;
//! // send `outcome.frame` to the client
//! # Ok(())
//! # }
//! ```

mod error;
mod login;
pub mod telemetry;

pub use error::{ClientCode, StrongholdError};
pub use login::{LoginConfig, LoginOutcome, LoginService};

pub use stronghold_avatar as avatar;
pub use stronghold_protocol as protocol;
pub use stronghold_store as store;

/// The types most callers need.
pub mod prelude {
    pub use crate::{ClientCode, LoginConfig, LoginOutcome, LoginService, StrongholdError};
    pub use stronghold_avatar::{Avatar, Token, Village};
    pub use stronghold_protocol::{LoginSuccessMessage, Message, MessageCodec};
    pub use stronghold_store::{AvatarStore, StoreConfig, StoreError};
}
