//! Per-tap view state.

use crate::beverage::BeverageMetadata;
use crate::sensor::SensorSnapshot;
use crate::tap::{Tap, TapBinding};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

/// Shared handle to one tap's view state.
///
/// Written only by the poller that owns the tap; everyone else reads. The
/// handle identity survives every poll, so observers can hold on to it.
pub type SharedTapView = Arc<RwLock<TapViewState>>;

/// A tap plus everything derived from it for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TapViewState {
    #[serde(flatten)]
    pub tap: Tap,
    /// No beverage is bound.
    pub is_empty: bool,
    /// At least one sub-fetch is in flight.
    pub is_loading: bool,
    /// Present only when the tap is bound and metadata resolved.
    pub beverage: Option<BeverageMetadata>,
    /// Present only when the tap has a sensor.
    pub sensor: Option<SensorSnapshot>,
}

impl TapViewState {
    pub fn new(tap: Tap) -> Self {
        let is_empty = tap.is_empty();
        Self {
            tap,
            is_empty,
            is_loading: false,
            beverage: None,
            sensor: None,
        }
    }

    /// Wrap into a shared handle.
    pub fn into_shared(self) -> SharedTapView {
        Arc::new(RwLock::new(self))
    }

    /// Replace the tap fields with a freshly fetched record.
    ///
    /// Derived fields that no longer apply are dropped: the beverage when
    /// the binding changed, the sensor snapshot when the sensor changed.
    pub fn replace_tap(&mut self, tap: Tap) {
        if tap.binding() != self.tap.binding() {
            self.beverage = None;
        }
        if tap.sensor_id() != self.tap.sensor_id() {
            self.sensor = None;
        }
        self.is_empty = tap.is_empty();
        self.tap = tap;
    }

    /// Current binding of the wrapped tap.
    pub fn binding(&self) -> TapBinding {
        self.tap.binding()
    }

    /// Sensor snapshot, created on first write.
    pub fn sensor_mut(&mut self) -> &mut SensorSnapshot {
        self.sensor.get_or_insert_with(SensorSnapshot::default)
    }
}
