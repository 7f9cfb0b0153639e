//! Login flow: turning a client's token into an avatar and a reply frame.
//!
//! ```text
//! login(None)        ──→ store.create() ─┐
//!                                        ├─→ bump login stats ─→ save ─→ LoginSuccessMessage
//! login(Some(token)) ──→ store.load()  ──┘
//! ```

use std::sync::Arc;

use chrono::{SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use stronghold_avatar::Avatar;
use stronghold_protocol::{LoginSuccessMessage, MessageCodec};
use stronghold_store::AvatarStore;

use crate::StrongholdError;

/// Server identity reported to clients on login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginConfig {
    pub major_version: i32,
    pub minor_version: i32,
    pub revision_version: i32,

    /// Environment name sent to the client, e.g. `"prod"` or `"dev"`.
    pub environment: String,

    /// Two-letter country code sent to the client.
    pub country_code: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            major_version: 7,
            minor_version: 156,
            revision_version: 1,
            environment: "prod".to_string(),
            country_code: "US".to_string(),
        }
    }
}

/// A completed login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The avatar as saved after the login.
    pub avatar: Avatar,
    /// `true` if the avatar was created by this login.
    pub created: bool,
    pub message: LoginSuccessMessage,
    /// `message` encoded as a wire frame.
    pub frame: Vec<u8>,
}

/// Handles logins against a shared [`AvatarStore`].
///
/// Shared between connection tasks behind an `Arc`.
#[derive(Debug)]
pub struct LoginService {
    store: Arc<AvatarStore>,
    config: LoginConfig,
    codec: MessageCodec,
}

impl LoginService {
    pub fn new(store: Arc<AvatarStore>, config: LoginConfig) -> Self {
        Self {
            store,
            config,
            codec: MessageCodec,
        }
    }

    pub fn store(&self) -> &Arc<AvatarStore> {
        &self.store
    }

    pub fn config(&self) -> &LoginConfig {
        &self.config
    }

    /// Logs a client in.
    ///
    /// Without a token a new avatar is created. With one, the avatar
    /// stored under it is loaded. Either way the login count is bumped,
    /// the last-played time set to now, the avatar saved, and the reply
    /// built and encoded.
    ///
    /// # Errors
    /// - [`StrongholdError::Store`] if the token is unknown or invalid
    ///   (both report [`ClientCode::NotFound`](crate::ClientCode::NotFound)),
    ///   the record is corrupt, or storage is unavailable
    /// - [`StrongholdError::Protocol`] if the reply can't be encoded; the
    ///   avatar has already been saved in that case
    pub async fn login(
        &self,
        token: Option<&str>,
    ) -> Result<LoginOutcome, StrongholdError> {
        let (mut avatar, created) = match token {
            Some(token) => (self.store.load(token).await?, false),
            None => (self.store.create(None, None).await?, true),
        };

        avatar.login_count = avatar.login_count.saturating_add(1);
        avatar.date_last_played = Utc::now().trunc_subsecs(3);
        self.store.save(&avatar).await?;

        let message = self.success_message(&avatar)?;
        let frame = self.codec.encode(&message)?;

        tracing::info!(
            token = %avatar.require_token()?,
            id = avatar.id(),
            created,
            logins = avatar.login_count,
            "login accepted"
        );

        Ok(LoginOutcome {
            avatar,
            created,
            message,
            frame,
        })
    }

    /// Adds `played` to the play time of the avatar stored under `token`
    /// and saves it. Sub-second remainders are dropped.
    ///
    /// # Errors
    /// Same as [`AvatarStore::load`] and [`AvatarStore::save`].
    pub async fn end_session(
        &self,
        token: &str,
        played: TimeDelta,
    ) -> Result<Avatar, StrongholdError> {
        let mut avatar = self.store.load(token).await?;
        let whole = TimeDelta::seconds(played.num_seconds().max(0));
        avatar.play_time = avatar
            .play_time
            .checked_add(&whole)
            .unwrap_or(avatar.play_time);
        self.store.save(&avatar).await?;
        tracing::debug!(token, played_secs = whole.num_seconds(), "session ended");
        Ok(avatar)
    }

    /// Builds the login reply for `avatar`.
    ///
    /// # Errors
    /// Returns [`StrongholdError::Validation`] if the avatar has no token.
    pub fn success_message(
        &self,
        avatar: &Avatar,
    ) -> Result<LoginSuccessMessage, StrongholdError> {
        let token = avatar.require_token()?;
        Ok(LoginSuccessMessage {
            user_id: avatar.id(),
            user_id_copy: avatar.id(),
            user_token: token.to_string(),
            facebook_id: None,
            game_center_id: None,
            major_version: self.config.major_version,
            minor_version: self.config.minor_version,
            revision_version: self.config.revision_version,
            server_environment: self.config.environment.clone(),
            login_count: avatar.login_count,
            play_time: TimeDelta::seconds(avatar.play_time.num_seconds()),
            unknown1: 0,
            facebook_app_id: None,
            date_last_played: avatar.date_last_played.trunc_subsecs(3),
            date_joined: avatar.date_joined.trunc_subsecs(3),
            unknown2: 0,
            google_plus_id: None,
            country_code: self.config.country_code.clone(),
        })
    }
}
