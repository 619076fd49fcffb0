//! Resource client trait.
//!
//! Abstracts the backend so the sync engine can be driven by the real HTTP
//! client in production and by scripted mocks in tests.

use std::future::Future;
use std::pin::Pin;

use ontap_core::{
    BeverageMetadata, Location, LocationIdentifier, RefreshSettings, SensorIdentity, Tap, TapId,
};

use crate::error::ClientResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote calls consumed by the dashboard sync engine.
///
/// Each call is independent and single-shot: no retries, no caching.
pub trait ResourceClient: Send + Sync {
    /// Refresh jitter configuration.
    fn get_refresh_settings(&self) -> BoxFuture<'_, ClientResult<RefreshSettings>>;

    /// Location by id or slug. Fails with `NotFound` for unknown locations.
    fn get_location<'a>(
        &'a self,
        identifier: &'a LocationIdentifier,
    ) -> BoxFuture<'a, ClientResult<Location>>;

    /// Taps of a location, in backend order.
    fn get_taps<'a>(&'a self, location_id: &'a str) -> BoxFuture<'a, ClientResult<Vec<Tap>>>;

    /// Current record of a single tap.
    fn get_tap<'a>(&'a self, tap_id: &'a TapId) -> BoxFuture<'a, ClientResult<Tap>>;

    /// Metadata for a beer or beverage id.
    fn get_beverage_metadata<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, ClientResult<BeverageMetadata>>;

    /// Sensor identity record.
    fn get_sensor<'a>(&'a self, sensor_id: &'a str) -> BoxFuture<'a, ClientResult<SensorIdentity>>;

    /// Percent of the keg remaining behind a sensor.
    fn get_sensor_percent_remaining<'a>(
        &'a self,
        sensor_id: &'a str,
    ) -> BoxFuture<'a, ClientResult<f64>>;

    /// Absolute remaining volume behind a sensor.
    fn get_sensor_total_remaining<'a>(
        &'a self,
        sensor_id: &'a str,
    ) -> BoxFuture<'a, ClientResult<f64>>;

    /// Display unit of the sensor's volume readings.
    fn get_sensor_unit<'a>(&'a self, sensor_id: &'a str) -> BoxFuture<'a, ClientResult<String>>;
}
