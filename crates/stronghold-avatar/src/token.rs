//! Session tokens: generation and validation.
//!
//! A token is both the player's credential and the name of their record
//! on disk, so every string that claims to be a token is checked against
//! the same format before it's accepted anywhere.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Exact number of characters in a token.
pub const TOKEN_LENGTH: usize = 40;

/// Characters a token may contain.
pub const TOKEN_ALPHABET: &[u8; 36] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Returns `true` iff `token` has exactly [`TOKEN_LENGTH`] characters, all
/// drawn from [`TOKEN_ALPHABET`].
pub fn is_valid(token: &str) -> bool {
    token.len() == TOKEN_LENGTH
        && token.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// A string that is known to satisfy the token format.
///
/// The only ways to get one are [`TokenGenerator::generate`] and the
/// parsing conversions, all of which validate. Serde deserialization goes
/// through [`TryFrom<String>`], so a record with a malformed token fails
/// to load instead of producing an invalid `Token`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Validates `s` and wraps it.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidToken`] if `s` fails [`is_valid`].
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if is_valid(s) {
            Ok(Self(s.to_owned()))
        } else {
            Err(ValidationError::InvalidToken(s.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for Token {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Token {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidToken(s))
        }
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lets a `HashSet<Token>` or `HashMap<Token, _>` be queried with a `&str`.
impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Something that can hand out fresh tokens.
///
/// The store asks its source for tokens when the caller doesn't supply
/// one. [`TokenGenerator`] is the production source; tests plug in a
/// scripted one to force collisions.
pub trait TokenSource: Send + Sync + 'static {
    /// Returns a token. It need not be unique; the caller checks.
    fn next_token(&self) -> Token;
}

/// Random token generator.
///
/// Draws each character independently and uniformly from the alphabet,
/// which gives 36^40 (about 2^206) possible tokens. That makes collisions
/// negligible but not impossible, so callers still check against the
/// store before using a token.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenGenerator;

impl TokenGenerator {
    /// Generates a random token.
    pub fn generate() -> Token {
        let mut rng = rand::rng();
        let token: String = (0..TOKEN_LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..TOKEN_ALPHABET.len());
                char::from(TOKEN_ALPHABET[idx])
            })
            .collect();
        debug_assert!(is_valid(&token));
        Token(token)
    }

    /// Same as the free function [`is_valid`].
    pub fn is_valid(token: &str) -> bool {
        is_valid(token)
    }
}

impl TokenSource for TokenGenerator {
    fn next_token(&self) -> Token {
        Self::generate()
    }
}
