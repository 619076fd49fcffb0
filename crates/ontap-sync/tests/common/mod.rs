//! Shared fixtures for sync engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use ontap_client::MockResourceClient;
use ontap_core::{BeverageMetadata, Location, RefreshSettings, SensorIdentity, Tap};
use ontap_sync::{DashboardSyncController, RecordingShell};
use serde_json::json;

/// Controller wired to a scripted backend and a recording shell.
pub struct Harness {
    pub mock: Arc<MockResourceClient>,
    pub shell: Arc<RecordingShell>,
    pub controller: Arc<DashboardSyncController>,
}

impl Harness {
    pub fn new() -> Self {
        let mock = Arc::new(MockResourceClient::new());
        let shell = Arc::new(RecordingShell::new());
        let controller = Arc::new(DashboardSyncController::new(mock.clone(), shell.clone()));
        Self {
            mock,
            shell,
            controller,
        }
    }

    /// Script settings, the `downtown` location (id `L1`) and its tap list.
    pub fn with_location(self, settings: RefreshSettings, taps: Vec<Tap>) -> Self {
        self.mock.set_settings(Ok(settings));
        self.mock.set_location("downtown", Ok(location("L1", "Downtown")));
        for tap in &taps {
            self.mock.set_tap(tap.clone());
        }
        self.mock.set_taps("L1", Ok(taps));
        self
    }
}

pub fn settings(base_sec: u64, variable_sec: u64) -> RefreshSettings {
    RefreshSettings::new(base_sec, variable_sec).unwrap()
}

pub fn location(id: &str, description: &str) -> Location {
    Location {
        id: id.to_string(),
        name: format!("{description} Taproom"),
        description: description.to_string(),
    }
}

pub fn empty_tap(id: &str, number: u32) -> Tap {
    Tap::new(id, number)
}

pub fn beer_tap(id: &str, number: u32, beer_id: &str, sensor_id: Option<&str>) -> Tap {
    Tap {
        beer_id: Some(beer_id.to_string()),
        sensor_id: sensor_id.map(String::from),
        ..Tap::new(id, number)
    }
}

/// Script a sensor identity plus all three metrics.
pub fn script_sensor(mock: &MockResourceClient, sensor_id: &str, percent: f64, total: f64) {
    mock.set_sensor(
        sensor_id,
        Ok(SensorIdentity {
            id: sensor_id.to_string(),
            name: format!("Sensor {sensor_id}"),
            last_updated_on: Some(json!(1705315200)),
        }),
    );
    mock.set_percent_remaining(sensor_id, Ok(percent));
    mock.set_total_remaining(sensor_id, Ok(total));
    mock.set_unit(sensor_id, Ok("gal".to_string()));
}

pub fn script_beer(mock: &MockResourceClient, beer_id: &str, name: &str) {
    mock.set_beverage(beer_id, Ok(BeverageMetadata::named(beer_id, name)));
}
