//! `LoginSuccessMessage`: the server's reply to an accepted login.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{Message, MessageReader, MessageWriter, ProtocolError};

/// Sent by the server once a login request has been accepted.
///
/// Carries the player's identity (id and token), linked account ids, the
/// server version and environment, and a few account statistics.
///
/// Field order on the wire is the declaration order below.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginSuccessMessage {
    pub user_id: i64,
    /// Same value as `user_id`; the client expects it twice.
    pub user_id_copy: i64,
    pub user_token: String,
    pub facebook_id: Option<String>,
    pub game_center_id: Option<String>,
    pub major_version: i32,
    pub minor_version: i32,
    pub revision_version: i32,
    /// Environment name, e.g. `"prod"` or `"dev"`.
    pub server_environment: String,
    /// Number of times the account has logged in.
    pub login_count: i32,
    /// Total time spent logged in.
    pub play_time: TimeDelta,
    pub unknown1: i32,
    pub facebook_app_id: Option<String>,
    pub date_last_played: DateTime<Utc>,
    pub date_joined: DateTime<Utc>,
    pub unknown2: i32,
    pub google_plus_id: Option<String>,
    pub country_code: String,
}

impl Message for LoginSuccessMessage {
    const ID: u16 = 20104;

    fn read_message(
        reader: &mut MessageReader<'_>,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            user_id: reader.read_id()?,
            user_id_copy: reader.read_id()?,
            user_token: reader.read_string()?,
            facebook_id: reader.read_nullable_string()?,
            game_center_id: reader.read_nullable_string()?,
            major_version: reader.read_i32()?,
            minor_version: reader.read_i32()?,
            revision_version: reader.read_i32()?,
            server_environment: reader.read_string()?,
            login_count: reader.read_i32()?,
            play_time: reader.read_duration()?,
            unknown1: reader.read_i32()?,
            facebook_app_id: reader.read_nullable_string()?,
            date_last_played: reader.read_timestamp()?,
            date_joined: reader.read_timestamp()?,
            unknown2: reader.read_i32()?,
            google_plus_id: reader.read_nullable_string()?,
            country_code: reader.read_string()?,
        })
    }

    fn write_message(
        &self,
        writer: &mut MessageWriter,
    ) -> Result<(), ProtocolError> {
        writer.write_id(self.user_id)?;
        writer.write_id(self.user_id_copy)?;
        writer.write_string(&self.user_token)?;
        writer.write_nullable_string(self.facebook_id.as_deref())?;
        writer.write_nullable_string(self.game_center_id.as_deref())?;
        writer.write_i32(self.major_version);
        writer.write_i32(self.minor_version);
        writer.write_i32(self.revision_version);
        writer.write_string(&self.server_environment)?;
        writer.write_i32(self.login_count);
        writer.write_duration(self.play_time)?;
        writer.write_i32(self.unknown1);
        writer.write_nullable_string(self.facebook_app_id.as_deref())?;
        writer.write_timestamp(&self.date_last_played)?;
        writer.write_timestamp(&self.date_joined)?;
        writer.write_i32(self.unknown2);
        writer.write_nullable_string(self.google_plus_id.as_deref())?;
        writer.write_string(&self.country_code)
    }
}
