//! Core domain types for the OnTap tap dashboard.
//!
//! This crate provides the types shared by the client, the sync engine and
//! the dashboard surface:
//! - `Location`, `RefreshSettings`: per-bootstrap, immutable session data
//! - `Tap`, `TapBinding`: backend tap records and their classification
//! - `BeverageMetadata`, `SensorIdentity`, `SensorSnapshot`: resolved detail
//! - `TapViewState`: the per-tap view model owned by one poller

pub mod beverage;
pub mod error;
pub mod location;
pub mod sensor;
pub mod settings;
pub mod tap;
pub mod view;

pub use beverage::BeverageMetadata;
pub use error::{CoreError, Result};
pub use location::{Location, LocationIdentifier};
pub use sensor::{normalize_last_updated_on, SensorIdentity, SensorSnapshot};
pub use settings::RefreshSettings;
pub use tap::{sort_by_tap_number, Tap, TapBinding, TapId, TapType};
pub use view::{SharedTapView, TapViewState};
