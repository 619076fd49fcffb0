//! Dashboard API types.
//!
//! These types are used for JSON serialization in REST and WebSocket APIs.

use ontap_core::{Location, TapViewState};
use serde::Serialize;

/// Full dashboard state snapshot (sent on initial connection and via REST).
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    /// Timestamp when snapshot was taken (Unix milliseconds).
    pub timestamp_ms: i64,
    /// Current shell title, once a bootstrap succeeded.
    pub title: Option<String>,
    /// Location being displayed.
    pub location: Option<LocationSnapshot>,
    /// A bootstrap is in flight.
    pub loading: bool,
    /// Taps sorted by tap number.
    pub taps: Vec<TapSnapshot>,
    /// Most recent toast, if any.
    pub last_toast: Option<ToastSnapshot>,
    /// The engine asked to leave the dashboard.
    pub navigate_home: bool,
}

/// Location summary.
#[derive(Debug, Clone, Serialize)]
pub struct LocationSnapshot {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<&Location> for LocationSnapshot {
    fn from(location: &Location) -> Self {
        Self {
            id: location.id.clone(),
            name: location.name.clone(),
            description: location.description.clone(),
        }
    }
}

/// Display row for one tap.
#[derive(Debug, Clone, Serialize)]
pub struct TapSnapshot {
    /// Tap ID.
    pub tap_id: String,
    /// Ordinal position at the bar.
    pub tap_number: u32,
    /// Binding label: "empty", "beer", "cold_brew", "beverage" or "batch".
    pub binding: &'static str,
    pub is_empty: bool,
    pub is_loading: bool,
    /// Beverage name (if resolved).
    pub beverage_name: Option<String>,
    pub brewery: Option<String>,
    pub style: Option<String>,
    /// Alcohol by volume, percent.
    pub abv: Option<f64>,
    /// Percent of the keg remaining (0-100), if the tap has a sensor.
    pub percent_remaining: Option<f64>,
    /// Absolute volume remaining, in `unit`.
    pub total_remaining: Option<f64>,
    pub unit: Option<String>,
    /// Last sensor reading (Unix milliseconds).
    pub last_updated_ms: Option<i64>,
}

impl From<&TapViewState> for TapSnapshot {
    fn from(view: &TapViewState) -> Self {
        let beverage = view.beverage.as_ref();
        let sensor = view.sensor.as_ref();

        Self {
            tap_id: view.tap.id.to_string(),
            tap_number: view.tap.tap_number,
            binding: view.binding().label(),
            is_empty: view.is_empty,
            is_loading: view.is_loading,
            beverage_name: beverage.map(|b| b.name.clone()),
            brewery: beverage.and_then(|b| b.brewery.clone()),
            style: beverage.and_then(|b| b.style.clone()),
            abv: beverage.and_then(|b| b.abv),
            percent_remaining: sensor.map(|s| s.percent_remaining),
            total_remaining: sensor.map(|s| s.total_remaining),
            unit: sensor.map(|s| s.unit.clone()),
            last_updated_ms: sensor
                .and_then(|s| s.last_updated_on)
                .map(|t| t.timestamp_millis()),
        }
    }
}

/// A toast raised by the sync engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToastSnapshot {
    /// Monotonic toast counter, so clients can tell repeats apart.
    pub seq: u64,
    /// When the toast was raised (Unix milliseconds).
    pub timestamp_ms: i64,
    pub message: String,
}

/// WebSocket message types (tagged enum for type safety).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(DashboardSnapshot),
    /// Periodic update.
    Update {
        /// Update timestamp.
        timestamp_ms: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        loading: bool,
        taps: Vec<TapSnapshot>,
    },
    /// New toast.
    Toast(ToastSnapshot),
    /// Leave the dashboard.
    NavigateHome {
        /// Request number, increasing per request.
        seq: u64,
        /// Alert timestamp.
        timestamp_ms: i64,
    },
}
