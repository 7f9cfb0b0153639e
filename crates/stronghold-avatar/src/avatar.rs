//! The avatar: one player's persistent identity and game state.
//!
//! Most fields are plain public data. The three with invariants are kept
//! private behind accessors:
//!
//! - `token` only ever holds a valid [`Token`]
//! - `level` is never below 1
//! - `id` is fixed at construction

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::{AvatarSlots, Token, ValidationError, Village};

/// Lowest level the client accepts.
pub const MIN_LEVEL: i32 = 1;

/// A player's persistent state.
#[derive(Debug, Clone, PartialEq)]
pub struct Avatar {
    token: Option<Token>,
    id: i64,
    level: i32,

    /// Display name.
    pub name: String,
    /// Whether the player has chosen a name yet.
    pub is_named: bool,
    pub league: i32,
    pub experience: i32,
    pub gems: i32,
    pub free_gems: i32,
    pub trophies: i32,
    pub attacks_won: i32,
    pub attacks_lost: i32,
    pub defenses_won: i32,
    pub defenses_lost: i32,

    /// When the avatar's protection shield runs out.
    pub shield_end_time: DateTime<Utc>,

    /// Home village layout.
    pub home: Village,

    pub slots: AvatarSlots,

    /// Number of successful logins.
    pub login_count: i32,
    /// Total time spent logged in.
    pub play_time: TimeDelta,
    pub date_joined: DateTime<Utc>,
    pub date_last_played: DateTime<Utc>,
}

impl Avatar {
    /// Creates a minimally valid avatar: level 1, id 0, no token, no
    /// shield and empty collections.
    pub fn new() -> Self {
        Self::with_id(0)
    }

    /// Same as [`new`](Self::new) but with the given id. The id can't be
    /// changed afterwards.
    pub fn with_id(id: i64) -> Self {
        Self {
            token: None,
            id,
            level: MIN_LEVEL,
            name: String::new(),
            is_named: false,
            league: 0,
            experience: 0,
            gems: 0,
            free_gems: 0,
            trophies: 0,
            attacks_won: 0,
            attacks_lost: 0,
            defenses_won: 0,
            defenses_lost: 0,
            shield_end_time: DateTime::<Utc>::UNIX_EPOCH,
            home: Village::empty(),
            slots: AvatarSlots::default(),
            login_count: 0,
            play_time: TimeDelta::zero(),
            date_joined: DateTime::<Utc>::UNIX_EPOCH,
            date_last_played: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    // -- identity --

    pub fn id(&self) -> i64 {
        self.id
    }

    /// The avatar's token, or `None` if it was never assigned one.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Returns the token, failing for an avatar that has none.
    ///
    /// Use this wherever the avatar has to be addressable, e.g. before
    /// saving it.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingToken`] if no token was assigned.
    pub fn require_token(&self) -> Result<&Token, ValidationError> {
        self.token.as_ref().ok_or(ValidationError::MissingToken)
    }

    /// Validates and assigns a new token.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidToken`] if `token` doesn't match
    /// the token format. The previous token is kept in that case.
    pub fn set_token(&mut self, token: &str) -> Result<(), ValidationError> {
        self.token = Some(Token::parse(token)?);
        Ok(())
    }

    /// Assigns an already-validated token.
    pub fn assign_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    // -- level --

    pub fn level(&self) -> i32 {
        self.level
    }

    /// Sets the level.
    ///
    /// # Errors
    /// Returns [`ValidationError::LevelOutOfRange`] if `level` is below
    /// [`MIN_LEVEL`]; the current level is kept.
    pub fn set_level(&mut self, level: i32) -> Result<(), ValidationError> {
        if level < MIN_LEVEL {
            return Err(ValidationError::LevelOutOfRange(level));
        }
        self.level = level;
        Ok(())
    }

    // -- shield --

    /// Time left on the shield, measured against the current wall clock.
    /// Zero once the shield has run out.
    pub fn shield_duration(&self) -> Duration {
        self.shield_duration_at(Utc::now())
    }

    /// Time left on the shield as of `now`. Never negative.
    pub fn shield_duration_at(&self, now: DateTime<Utc>) -> Duration {
        (self.shield_end_time - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Starts a shield lasting `duration` from `now`.
    pub fn grant_shield(&mut self, now: DateTime<Utc>, duration: TimeDelta) {
        self.shield_end_time = now + duration;
    }

    pub fn is_shielded_at(&self, now: DateTime<Utc>) -> bool {
        self.shield_end_time > now
    }
}

impl Default for Avatar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenGenerator;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    // =====================================================================
    // new()
    // =====================================================================

    #[test]
    fn test_new_is_level_one_without_token() {
        let avatar = Avatar::new();

        assert_eq!(avatar.level(), 1);
        assert!(avatar.token().is_none());
        assert_eq!(avatar.id(), 0);
        assert!(avatar.slots.is_empty());
    }

    #[test]
    fn test_require_token_on_new_avatar_fails() {
        let avatar = Avatar::new();
        assert_eq!(avatar.require_token(), Err(ValidationError::MissingToken));
    }

    // =====================================================================
    // set_level()
    // =====================================================================

    #[test]
    fn test_set_level_below_one_rejected_and_unchanged() {
        let mut avatar = Avatar::new();
        avatar.set_level(12).unwrap();

        for bad in [0, -1, i32::MIN] {
            let result = avatar.set_level(bad);
            assert_eq!(result, Err(ValidationError::LevelOutOfRange(bad)));
            assert_eq!(avatar.level(), 12, "level must be unchanged");
        }
    }

    #[test]
    fn test_set_level_accepts_one_and_large_values() {
        let mut avatar = Avatar::new();
        avatar.set_level(1).unwrap();
        assert_eq!(avatar.level(), 1);
        avatar.set_level(i32::MAX).unwrap();
        assert_eq!(avatar.level(), i32::MAX);
    }

    // =====================================================================
    // set_token()
    // =====================================================================

    #[test]
    fn test_set_token_invalid_keeps_previous() {
        let mut avatar = Avatar::new();
        let good = TokenGenerator::generate();
        avatar.set_token(good.as_str()).unwrap();

        let result = avatar.set_token("BADTOKEN!");

        assert!(matches!(result, Err(ValidationError::InvalidToken(_))));
        assert_eq!(avatar.token(), Some(&good));
    }

    #[test]
    fn test_set_token_invalid_on_fresh_avatar_stays_none() {
        let mut avatar = Avatar::new();
        assert!(avatar.set_token("").is_err());
        assert!(avatar.token().is_none());
    }

    #[test]
    fn test_set_token_valid_replaces() {
        let mut avatar = Avatar::new();
        let first = TokenGenerator::generate();
        let second = TokenGenerator::generate();
        avatar.assign_token(first);

        avatar.set_token(second.as_str()).unwrap();

        assert_eq!(avatar.require_token().unwrap(), &second);
    }

    // =====================================================================
    // shield
    // =====================================================================

    #[test]
    fn test_shield_duration_counts_down() {
        let mut avatar = Avatar::new();
        avatar.grant_shield(at(1_000), TimeDelta::days(3));

        assert_eq!(
            avatar.shield_duration_at(at(1_000)),
            Duration::from_secs(259_200)
        );
        assert_eq!(
            avatar.shield_duration_at(at(1_000 + 200)),
            Duration::from_secs(259_000)
        );
    }

    #[test]
    fn test_shield_duration_never_negative() {
        let mut avatar = Avatar::new();
        avatar.shield_end_time = at(1_000);

        for now in [1_000, 1_001, 50_000, i64::from(i32::MAX)] {
            assert_eq!(avatar.shield_duration_at(at(now)), Duration::ZERO);
        }
        assert!(!avatar.is_shielded_at(at(1_000)));
    }

    #[test]
    fn test_shield_duration_on_new_avatar_is_zero() {
        assert_eq!(Avatar::new().shield_duration(), Duration::ZERO);
    }
}
