//! The avatar's home village layout.
//!
//! The layout format belongs to the content layer (buildings, traps,
//! decorations and their positions). This crate only carries it around as
//! JSON and never looks inside.

use serde::{Deserialize, Serialize};

/// An opaque village layout.
///
/// New avatars start from a shared template (the "starting village"),
/// which the caller loads once and hands to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Village(serde_json::Value);

impl Village {
    /// A village with no content. Used by [`Avatar::new`](crate::Avatar::new).
    pub fn empty() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }

    /// Parses a village layout from its JSON text.
    ///
    /// # Errors
    /// Returns the parser error if `json` isn't valid JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self)
    }

    /// Serializes the layout back to JSON text.
    pub fn to_json(&self) -> String {
        self.0.to_string()
    }

    /// Borrows the raw layout.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl Default for Village {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<serde_json::Value> for Village {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}
