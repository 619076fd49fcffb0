//! Inventory sensor types and timestamp normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw values below this are epoch seconds (at most 10 digits); values at
/// or above it are epoch milliseconds.
const SECONDS_THRESHOLD: i64 = 10_000_000_000;

/// Sensor record returned by the backend before metrics are fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorIdentity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Last reading time as reported, in seconds or milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_on: Option<Value>,
}

/// Remaining-volume metrics for the sensor attached to a tap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    /// Percent of the keg remaining, 0-100.
    pub percent_remaining: f64,
    /// Absolute remaining volume in `unit`.
    pub total_remaining: f64,
    /// Display unit label (e.g. "gal", "L").
    pub unit: String,
    /// Time of the last reading, if the sensor reported a usable one.
    pub last_updated_on: Option<DateTime<Utc>>,
}

impl SensorSnapshot {
    /// Store percent remaining, clamped to 0-100. Non-finite values become 0.
    pub fn set_percent_remaining(&mut self, value: f64) {
        self.percent_remaining = if value.is_finite() {
            value.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Store total remaining, floored at 0. Non-finite values become 0.
    pub fn set_total_remaining(&mut self, value: f64) {
        self.total_remaining = if value.is_finite() {
            value.max(0.0)
        } else {
            0.0
        };
    }

    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }
}

/// Normalize a backend `lastUpdatedOn` value into a UTC timestamp.
///
/// Accepts numbers or numeric strings. Values with at most 10 digits are
/// epoch seconds and are scaled to milliseconds; larger values are taken as
/// milliseconds. Negative, non-numeric or absent values yield `None`.
pub fn normalize_last_updated_on(raw: Option<&Value>) -> Option<DateTime<Utc>> {
    let raw = match raw? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?,
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))?
        }
        _ => return None,
    };

    if raw < 0 {
        return None;
    }

    let millis = if raw < SECONDS_THRESHOLD {
        raw.checked_mul(1000)?
    } else {
        raw
    };

    DateTime::from_timestamp_millis(millis)
}
