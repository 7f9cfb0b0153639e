//! On-disk record format.
//!
//! A record is a JSON document wrapping the avatar in a version envelope:
//!
//! ```json
//! { "version": 1, "avatar": { "token": "...", "id": 1, "level": 10, ... } }
//! ```
//!
//! The schema is separate from both the in-memory [`Avatar`] and the wire
//! messages. A new layout gets a new version number and its own record
//! struct.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use stronghold_avatar::{Avatar, AvatarSlots, Token, Village};

use crate::StoreError;

/// Version written by this build.
pub(crate) const RECORD_VERSION: u32 = 1;

/// File name of the record inside a token's directory.
pub(crate) const RECORD_FILE: &str = "avatar.json";

/// Name prefix of the scratch files a new record is written to before
/// being renamed over [`RECORD_FILE`]. Each write gets its own file.
pub(crate) const RECORD_TMP_PREFIX: &str = ".avatar.json.tmp-";

#[derive(Deserialize)]
struct VersionHeader {
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    avatar: AvatarRecordV1,
}

#[derive(Serialize, Deserialize)]
struct AvatarRecordV1 {
    token: Token,
    id: i64,
    level: i32,
    name: String,
    is_named: bool,
    league: i32,
    experience: i32,
    gems: i32,
    free_gems: i32,
    trophies: i32,
    attacks_won: i32,
    attacks_lost: i32,
    defenses_won: i32,
    defenses_lost: i32,
    shield_end_time: DateTime<Utc>,
    home: Village,
    slots: AvatarSlots,
    login_count: i32,
    /// Whole seconds; sub-second play time isn't kept.
    play_time_secs: i64,
    date_joined: DateTime<Utc>,
    date_last_played: DateTime<Utc>,
}

/// Serializes `avatar` into record bytes.
///
/// # Errors
/// Returns [`StoreError::Validation`] if the avatar has no token.
pub(crate) fn encode(avatar: &Avatar) -> Result<Vec<u8>, StoreError> {
    let token = avatar.require_token()?;
    let envelope = Envelope {
        version: RECORD_VERSION,
        avatar: AvatarRecordV1 {
            token: token.clone(),
            id: avatar.id(),
            level: avatar.level(),
            name: avatar.name.clone(),
            is_named: avatar.is_named,
            league: avatar.league,
            experience: avatar.experience,
            gems: avatar.gems,
            free_gems: avatar.free_gems,
            trophies: avatar.trophies,
            attacks_won: avatar.attacks_won,
            attacks_lost: avatar.attacks_lost,
            defenses_won: avatar.defenses_won,
            defenses_lost: avatar.defenses_lost,
            shield_end_time: avatar.shield_end_time,
            home: avatar.home.clone(),
            slots: avatar.slots.clone(),
            login_count: avatar.login_count,
            play_time_secs: avatar.play_time.num_seconds(),
            date_joined: avatar.date_joined,
            date_last_played: avatar.date_last_played,
        },
    };
    serde_json::to_vec_pretty(&envelope).map_err(|e| StoreError::corrupt(token, e))
}

/// Parses record bytes read from `token`'s directory.
///
/// # Errors
/// Returns [`StoreError::CorruptRecord`] if the bytes aren't a supported
/// record, if a field fails validation, or if the record names a
/// different token than the directory it was found in.
pub(crate) fn decode(token: &Token, bytes: &[u8]) -> Result<Avatar, StoreError> {
    let header: VersionHeader = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::corrupt(token, e))?;
    if header.version != RECORD_VERSION {
        return Err(StoreError::corrupt(
            token,
            format!("unsupported record version {}", header.version),
        ));
    }

    let Envelope { avatar: record, .. } = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::corrupt(token, e))?;

    if &record.token != token {
        return Err(StoreError::corrupt(
            token,
            format!("record belongs to token '{}'", record.token),
        ));
    }

    let mut avatar = Avatar::with_id(record.id);
    avatar.assign_token(record.token);
    avatar
        .set_level(record.level)
        .map_err(|e| StoreError::corrupt(token, e))?;
    avatar.name = record.name;
    avatar.is_named = record.is_named;
    avatar.league = record.league;
    avatar.experience = record.experience;
    avatar.gems = record.gems;
    avatar.free_gems = record.free_gems;
    avatar.trophies = record.trophies;
    avatar.attacks_won = record.attacks_won;
    avatar.attacks_lost = record.attacks_lost;
    avatar.defenses_won = record.defenses_won;
    avatar.defenses_lost = record.defenses_lost;
    avatar.shield_end_time = record.shield_end_time;
    avatar.home = record.home;
    avatar.slots = record.slots;
    avatar.login_count = record.login_count;
    avatar.play_time = TimeDelta::try_seconds(record.play_time_secs)
        .ok_or_else(|| StoreError::corrupt(token, "play time out of range"))?;
    avatar.date_joined = record.date_joined;
    avatar.date_last_played = record.date_last_played;
    Ok(avatar)
}

#[cfg(test)]
mod tests {
    use stronghold_avatar::{Slot, TokenGenerator};

    use super::*;

    fn sample() -> Avatar {
        let mut avatar = Avatar::with_id(7);
        avatar.assign_token(TokenGenerator::generate());
        avatar.set_level(33).unwrap();
        avatar.name = "Tester".into();
        avatar.gems = 12;
        avatar.trophies = 1500;
        avatar.play_time = TimeDelta::seconds(3661);
        avatar.slots.units = vec![Slot::new(4_000_000, 25), Slot::new(4_000_003, 2)];
        avatar.home = Village::from_json(r#"{"buildings":[]}"#).unwrap();
        avatar
    }

    #[test]
    fn test_decode_of_encode_preserves_avatar() {
        let avatar = sample();
        let token = avatar.token().unwrap().clone();

        let bytes = encode(&avatar).unwrap();
        let loaded = decode(&token, &bytes).unwrap();

        assert_eq!(loaded, avatar);
    }

    #[test]
    fn test_encode_without_token_fails_validation() {
        let result = encode(&Avatar::new());
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_encode_writes_version_envelope() {
        let bytes = encode(&sample()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["version"], RECORD_VERSION);
        assert_eq!(json["avatar"]["level"], 33);
    }

    #[test]
    fn test_decode_garbage_is_corrupt() {
        let token = TokenGenerator::generate();
        let result = decode(&token, b"\x00\x01not json");
        assert!(matches!(result, Err(StoreError::CorruptRecord { .. })));
    }

    #[test]
    fn test_decode_unknown_version_is_corrupt() {
        let avatar = sample();
        let token = avatar.token().unwrap().clone();
        let mut json: serde_json::Value =
            serde_json::from_slice(&encode(&avatar).unwrap()).unwrap();
        json["version"] = 99.into();

        let result = decode(&token, json.to_string().as_bytes());

        match result {
            Err(StoreError::CorruptRecord { reason, .. }) => {
                assert!(reason.contains("99"), "reason: {reason}");
            }
            other => panic!("expected CorruptRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_level_zero_is_corrupt() {
        let avatar = sample();
        let token = avatar.token().unwrap().clone();
        let mut json: serde_json::Value =
            serde_json::from_slice(&encode(&avatar).unwrap()).unwrap();
        json["avatar"]["level"] = 0.into();

        let result = decode(&token, json.to_string().as_bytes());

        assert!(matches!(result, Err(StoreError::CorruptRecord { .. })));
    }

    #[test]
    fn test_decode_foreign_token_is_corrupt() {
        let bytes = encode(&sample()).unwrap();
        let other = TokenGenerator::generate();

        let result = decode(&other, &bytes);

        assert!(matches!(result, Err(StoreError::CorruptRecord { .. })));
    }

    #[test]
    fn test_decode_invalid_token_field_is_corrupt() {
        let avatar = sample();
        let token = avatar.token().unwrap().clone();
        let mut json: serde_json::Value =
            serde_json::from_slice(&encode(&avatar).unwrap()).unwrap();
        json["avatar"]["token"] = "BADTOKEN!".into();

        let result = decode(&token, json.to_string().as_bytes());

        assert!(matches!(result, Err(StoreError::CorruptRecord { .. })));
    }
}
