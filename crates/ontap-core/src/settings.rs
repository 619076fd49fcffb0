//! Poll refresh settings.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Largest accepted `base_sec + variable_sec`, so the delay in milliseconds
/// always fits in a `u64`.
const MAX_WINDOW_SEC: u64 = u64::MAX / 1000;

/// Refresh jitter configuration.
///
/// Each poll delay is drawn uniformly from
/// `[max(0, base_sec - variable_sec), base_sec + variable_sec]` seconds.
/// `variable_sec >= 0` holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSettings {
    /// Center of the refresh interval (seconds).
    pub base_sec: u64,
    /// Half-width of the jitter window (seconds).
    #[serde(default)]
    pub variable_sec: u64,
}

impl RefreshSettings {
    /// Create validated settings.
    pub fn new(base_sec: u64, variable_sec: u64) -> Result<Self> {
        let settings = Self {
            base_sec,
            variable_sec,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the upper bound of the window is representable in ms.
    pub fn validate(&self) -> Result<()> {
        match self.base_sec.checked_add(self.variable_sec) {
            Some(upper) if upper <= MAX_WINDOW_SEC => Ok(()),
            _ => Err(CoreError::InvalidSettings(format!(
                "base_sec={} variable_sec={} overflows the delay window",
                self.base_sec, self.variable_sec
            ))),
        }
    }

    /// Lower bound of the window in seconds, clamped at zero.
    #[must_use]
    pub fn min_sec(&self) -> u64 {
        self.base_sec.saturating_sub(self.variable_sec)
    }

    /// Upper bound of the window in seconds.
    #[must_use]
    pub fn max_sec(&self) -> u64 {
        self.base_sec.saturating_add(self.variable_sec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let settings = RefreshSettings::new(300, 150).unwrap();
        assert_eq!(settings.min_sec(), 150);
        assert_eq!(settings.max_sec(), 450);
    }

    #[test]
    fn test_lower_bound_clamped_at_zero() {
        let settings = RefreshSettings::new(5, 20).unwrap();
        assert_eq!(settings.min_sec(), 0);
        assert_eq!(settings.max_sec(), 25);
    }

    #[test]
    fn test_overflowing_window_rejected() {
        assert!(RefreshSettings::new(u64::MAX, 1).is_err());
        assert!(RefreshSettings::new(u64::MAX / 1000 + 1, 0).is_err());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let settings: RefreshSettings =
            serde_json::from_str(r#"{"baseSec":60,"variableSec":10}"#).unwrap();
        assert_eq!(settings, RefreshSettings::new(60, 10).unwrap());
    }
}
