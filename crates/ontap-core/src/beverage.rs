//! Beverage metadata resolved for a bound tap.

use serde::{Deserialize, Serialize};

/// Display metadata for whatever a tap is pouring.
///
/// Beers and other beverages share one shape; the backend resolves either
/// kind of id through the same endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeverageMetadata {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brewery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Alcohol by volume, percent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abv: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl BeverageMetadata {
    /// Minimal metadata with only an id and a name.
    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            brewery: None,
            style: None,
            abv: None,
            ibu: None,
            description: None,
            image_url: None,
        }
    }
}
