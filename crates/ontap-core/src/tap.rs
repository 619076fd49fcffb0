//! Tap records and classification.
//!
//! A tap is bound to at most one beverage source through one of three
//! foreign keys (`beer_id`, `beverage_id`, `batch_id`) and optionally to one
//! inventory sensor. The backend may rebind a tap at any time (e.g. a keg
//! swap), so the binding is recomputed on every poll.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend tap identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TapId(pub String);

impl TapId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared tap type, as reported in the tap's `tapType` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapType {
    Beer,
    ColdBrew,
    Beverage,
}

impl TapType {
    /// Parse the backend's type string. Unknown values yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "beer" => Some(Self::Beer),
            "cold-brew" | "cold_brew" | "coldbrew" => Some(Self::ColdBrew),
            "beverage" => Some(Self::Beverage),
            _ => None,
        }
    }
}

/// What a tap is currently bound to, derived from its populated keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapBinding {
    /// None of `beer_id`, `beverage_id`, `batch_id` is populated.
    Empty,
    /// Bound to a beer; metadata is resolved by `beer_id`.
    Beer { beer_id: String },
    /// Declared cold-brew. Metadata resolution is not implemented for this
    /// type, so pollers clear the loading flag without fetching.
    ColdBrew,
    /// Bound to a non-beer beverage; metadata is resolved by `beverage_id`.
    Beverage { beverage_id: String },
    /// Only a batch is bound. Non-empty, but there is nothing to resolve.
    Batch { batch_id: String },
}

impl TapBinding {
    /// Label used in logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Beer { .. } => "beer",
            Self::ColdBrew => "cold_brew",
            Self::Beverage { .. } => "beverage",
            Self::Batch { .. } => "batch",
        }
    }
}

/// A pour point at a location, as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tap {
    pub id: TapId,
    /// Ordinal position at the bar, used for display ordering.
    pub tap_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tap_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beverage_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
}

/// Treat empty strings the same as absent keys.
fn populated(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl Tap {
    /// Create an unbound tap.
    pub fn new(id: impl Into<String>, tap_number: u32) -> Self {
        Self {
            id: TapId::new(id),
            tap_number,
            tap_type: None,
            beer_id: None,
            beverage_id: None,
            batch_id: None,
            sensor_id: None,
        }
    }

    pub fn beer_id(&self) -> Option<&str> {
        populated(&self.beer_id)
    }

    pub fn beverage_id(&self) -> Option<&str> {
        populated(&self.beverage_id)
    }

    pub fn batch_id(&self) -> Option<&str> {
        populated(&self.batch_id)
    }

    pub fn sensor_id(&self) -> Option<&str> {
        populated(&self.sensor_id)
    }

    pub fn tap_type(&self) -> Option<TapType> {
        self.tap_type.as_deref().and_then(TapType::parse)
    }

    /// A tap is empty iff none of its three binding keys is populated.
    pub fn is_empty(&self) -> bool {
        self.beer_id().is_none() && self.beverage_id().is_none() && self.batch_id().is_none()
    }

    /// Classify the tap.
    ///
    /// An explicit `tapType` selects the branch when its key is present;
    /// otherwise the first populated key wins (beer, beverage, batch).
    pub fn binding(&self) -> TapBinding {
        if self.is_empty() {
            return TapBinding::Empty;
        }

        match (self.tap_type(), self.beer_id(), self.beverage_id()) {
            (Some(TapType::ColdBrew), _, _) => return TapBinding::ColdBrew,
            (Some(TapType::Beverage), _, Some(id)) => {
                return TapBinding::Beverage {
                    beverage_id: id.to_string(),
                }
            }
            _ => {}
        }

        if let Some(id) = self.beer_id() {
            TapBinding::Beer {
                beer_id: id.to_string(),
            }
        } else if let Some(id) = self.beverage_id() {
            TapBinding::Beverage {
                beverage_id: id.to_string(),
            }
        } else {
            // is_empty() was false, so batch_id is populated
            TapBinding::Batch {
                batch_id: self.batch_id().unwrap_or_default().to_string(),
            }
        }
    }
}

/// Sort taps by ordinal position for display. Stable for equal numbers.
pub fn sort_by_tap_number(taps: &mut [Tap]) {
    taps.sort_by_key(|t| t.tap_number);
}
