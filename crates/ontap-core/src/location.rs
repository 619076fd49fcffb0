//! Venue location types.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier used to look a location up (numeric id or slug).
///
/// The backend accepts either form, so the identifier is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationIdentifier(String);

impl LocationIdentifier {
    /// Parse an identifier, rejecting blank input.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidIdentifier(
                "location identifier is empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A venue whose taps are shown on the dashboard.
///
/// Fetched once per bootstrap and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Backend id, used to list the location's taps.
    pub id: String,
    /// Short human name.
    pub name: String,
    /// Display description, shown in the window title.
    #[serde(default)]
    pub description: String,
}

impl Location {
    /// Title shown by the surrounding shell once the dashboard is loaded.
    pub fn dashboard_title(&self) -> String {
        format!("On Tap: {}", self.description)
    }
}
