//! Scripted in-memory [`ResourceClient`] for tests.
//!
//! Responses are keyed by the id each call is made with. Unscripted ids
//! fail with `NotFound`, like a backend that never heard of the resource.
//! Every call is recorded so tests can assert on call counts and order.
//!
//! Only compiled for tests or with the `mock` feature. The call log grows
//! with every request and is never trimmed.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;

use ontap_core::{
    BeverageMetadata, Location, LocationIdentifier, RefreshSettings, SensorIdentity, Tap, TapId,
};

use crate::client::{BoxFuture, ResourceClient};
use crate::error::{ClientError, ClientResult};

/// Which backend call a mock response or recorded call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Settings,
    Location,
    Taps,
    Tap,
    Beverage,
    Sensor,
    PercentRemaining,
    TotalRemaining,
    Unit,
}

#[derive(Default)]
struct Script {
    settings: Option<ClientResult<RefreshSettings>>,
    locations: HashMap<String, ClientResult<Location>>,
    taps: HashMap<String, ClientResult<Vec<Tap>>>,
    tap: HashMap<String, ClientResult<Tap>>,
    beverages: HashMap<String, ClientResult<BeverageMetadata>>,
    sensors: HashMap<String, ClientResult<SensorIdentity>>,
    percent: HashMap<String, ClientResult<f64>>,
    total: HashMap<String, ClientResult<f64>>,
    unit: HashMap<String, ClientResult<String>>,
    latency: HashMap<(Endpoint, Option<String>), Duration>,
}

/// Mock resource client.
#[derive(Default)]
pub struct MockResourceClient {
    script: Mutex<Script>,
    calls: Mutex<Vec<(Endpoint, String)>>,
}

fn lookup<T: Clone>(map: &HashMap<String, ClientResult<T>>, key: &str, what: &str) -> ClientResult<T> {
    map.get(key)
        .cloned()
        .unwrap_or_else(|| Err(ClientError::NotFound(format!("{what} {key} not found"))))
}

impl MockResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    // === Scripting ===

    pub fn set_settings(&self, result: ClientResult<RefreshSettings>) {
        self.script.lock().settings = Some(result);
    }

    pub fn set_location(&self, identifier: &str, result: ClientResult<Location>) {
        self.script
            .lock()
            .locations
            .insert(identifier.to_string(), result);
    }

    pub fn set_taps(&self, location_id: &str, result: ClientResult<Vec<Tap>>) {
        self.script.lock().taps.insert(location_id.to_string(), result);
    }

    /// Script the tap detail response for `tap.id`.
    pub fn set_tap(&self, tap: Tap) {
        let key = tap.id.to_string();
        self.script.lock().tap.insert(key, Ok(tap));
    }

    /// Script a tap detail response by id (use for failures).
    pub fn set_tap_result(&self, tap_id: &str, result: ClientResult<Tap>) {
        self.script.lock().tap.insert(tap_id.to_string(), result);
    }

    pub fn set_beverage(&self, id: &str, result: ClientResult<BeverageMetadata>) {
        self.script.lock().beverages.insert(id.to_string(), result);
    }

    pub fn set_sensor(&self, sensor_id: &str, result: ClientResult<SensorIdentity>) {
        self.script
            .lock()
            .sensors
            .insert(sensor_id.to_string(), result);
    }

    pub fn set_percent_remaining(&self, sensor_id: &str, result: ClientResult<f64>) {
        self.script
            .lock()
            .percent
            .insert(sensor_id.to_string(), result);
    }

    pub fn set_total_remaining(&self, sensor_id: &str, result: ClientResult<f64>) {
        self.script
            .lock()
            .total
            .insert(sensor_id.to_string(), result);
    }

    pub fn set_unit(&self, sensor_id: &str, result: ClientResult<String>) {
        self.script.lock().unit.insert(sensor_id.to_string(), result);
    }

    /// Delay every response of `endpoint` by `latency` (tokio time).
    pub fn set_latency(&self, endpoint: Endpoint, latency: Duration) {
        self.script.lock().latency.insert((endpoint, None), latency);
    }

    /// Delay responses of `endpoint` for one key only. Overrides
    /// [`set_latency`](Self::set_latency) for that key.
    pub fn set_latency_for(&self, endpoint: Endpoint, key: &str, latency: Duration) {
        self.script
            .lock()
            .latency
            .insert((endpoint, Some(key.to_string())), latency);
    }

    // === Inspection ===

    /// Total number of calls made to `endpoint`.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls.lock().iter().filter(|(e, _)| *e == endpoint).count()
    }

    /// Number of calls made to `endpoint` for `key`.
    pub fn calls_for(&self, endpoint: Endpoint, key: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(e, k)| *e == endpoint && k == key)
            .count()
    }

    /// Every call in the order it was made.
    pub fn call_log(&self) -> Vec<(Endpoint, String)> {
        self.calls.lock().clone()
    }

    /// Record the call and apply any scripted latency.
    async fn enter(&self, endpoint: Endpoint, key: &str) {
        self.calls.lock().push((endpoint, key.to_string()));
        let latency = {
            let script = self.script.lock();
            script
                .latency
                .get(&(endpoint, Some(key.to_string())))
                .or_else(|| script.latency.get(&(endpoint, None)))
                .copied()
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl ResourceClient for MockResourceClient {
    fn get_refresh_settings(&self) -> BoxFuture<'_, ClientResult<RefreshSettings>> {
        Box::pin(async move {
            self.enter(Endpoint::Settings, "").await;
            self.script.lock().settings.clone().unwrap_or_else(|| {
                Err(ClientError::Status {
                    status: 500,
                    message: "refresh settings not configured".to_string(),
                })
            })
        })
    }

    fn get_location<'a>(
        &'a self,
        identifier: &'a LocationIdentifier,
    ) -> BoxFuture<'a, ClientResult<Location>> {
        Box::pin(async move {
            self.enter(Endpoint::Location, identifier.as_str()).await;
            lookup(&self.script.lock().locations, identifier.as_str(), "location")
        })
    }

    fn get_taps<'a>(&'a self, location_id: &'a str) -> BoxFuture<'a, ClientResult<Vec<Tap>>> {
        Box::pin(async move {
            self.enter(Endpoint::Taps, location_id).await;
            lookup(&self.script.lock().taps, location_id, "taps for location")
        })
    }

    fn get_tap<'a>(&'a self, tap_id: &'a TapId) -> BoxFuture<'a, ClientResult<Tap>> {
        Box::pin(async move {
            self.enter(Endpoint::Tap, tap_id.as_str()).await;
            lookup(&self.script.lock().tap, tap_id.as_str(), "tap")
        })
    }

    fn get_beverage_metadata<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, ClientResult<BeverageMetadata>> {
        Box::pin(async move {
            self.enter(Endpoint::Beverage, id).await;
            lookup(&self.script.lock().beverages, id, "beverage")
        })
    }

    fn get_sensor<'a>(&'a self, sensor_id: &'a str) -> BoxFuture<'a, ClientResult<SensorIdentity>> {
        Box::pin(async move {
            self.enter(Endpoint::Sensor, sensor_id).await;
            lookup(&self.script.lock().sensors, sensor_id, "sensor")
        })
    }

    fn get_sensor_percent_remaining<'a>(
        &'a self,
        sensor_id: &'a str,
    ) -> BoxFuture<'a, ClientResult<f64>> {
        Box::pin(async move {
            self.enter(Endpoint::PercentRemaining, sensor_id).await;
            lookup(&self.script.lock().percent, sensor_id, "percent remaining for sensor")
        })
    }

    fn get_sensor_total_remaining<'a>(
        &'a self,
        sensor_id: &'a str,
    ) -> BoxFuture<'a, ClientResult<f64>> {
        Box::pin(async move {
            self.enter(Endpoint::TotalRemaining, sensor_id).await;
            lookup(&self.script.lock().total, sensor_id, "total remaining for sensor")
        })
    }

    fn get_sensor_unit<'a>(&'a self, sensor_id: &'a str) -> BoxFuture<'a, ClientResult<String>> {
        Box::pin(async move {
            self.enter(Endpoint::Unit, sensor_id).await;
            lookup(&self.script.lock().unit, sensor_id, "unit for sensor")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_unscripted_calls_are_not_found() {
        let mock = MockResourceClient::new();
        let err = assert_err!(mock.get_tap(&TapId::new("t9")).await);
        assert!(err.is_not_found());
        assert_eq!(mock.calls_for(Endpoint::Tap, "t9"), 1);
    }

    #[tokio::test]
    async fn test_scripted_responses_and_call_log() {
        let mock = MockResourceClient::new();
        mock.set_settings(Ok(RefreshSettings::new(60, 5).unwrap()));
        mock.set_percent_remaining("S1", Ok(55.0));

        assert_eq!(mock.get_refresh_settings().await.unwrap().base_sec, 60);
        assert_eq!(mock.get_sensor_percent_remaining("S1").await.unwrap(), 55.0);
        assert_eq!(
            mock.call_log(),
            vec![
                (Endpoint::Settings, String::new()),
                (Endpoint::PercentRemaining, "S1".to_string())
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_uses_tokio_time() {
        let mock = MockResourceClient::new();
        mock.set_unit("S1", Ok("gal".to_string()));
        mock.set_latency(Endpoint::Unit, Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        assert_eq!(mock.get_sensor_unit("S1").await.unwrap(), "gal");
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
