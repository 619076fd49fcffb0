//! OnTap tap dashboard service.
//!
//! Main application that wires the components together:
//! - HTTP resource client for the inventory/sensor backend
//! - Dashboard sync engine (bootstrap chain and per-tap pollers)
//! - Web dashboard and metrics endpoint
//! - Periodic re-bootstrap so removed taps stop and new taps start

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, TelemetryConfig};
pub use error::{AppError, AppResult};
