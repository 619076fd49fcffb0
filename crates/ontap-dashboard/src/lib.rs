//! ontap-dashboard - Live tap dashboard for OnTap.
//!
//! Serves the state kept current by the sync engine:
//!
//! - REST API for fetching the current dashboard
//! - WebSocket for periodic updates plus toast and navigate-home messages
//! - Prometheus metrics
//! - Static HTML dashboard UI
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          ontap process                         │
//! │                                                              │
//! │  ┌──────────────────────────┐    ┌────────────────────────┐  │
//! │  │ DashboardSyncController  │───▶│ DashboardShell         │  │
//! │  │ (tap views, pollers)     │    │ (title, toast, home)   │  │
//! │  └────────────┬─────────────┘    └───────────┬────────────┘  │
//! │               └───────────────┬──────────────┘               │
//! │                               ▼                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │            DashboardState (aggregates data)            │  │
//! │  └──────────────────────────┬─────────────────────────────┘  │
//! │                             │                                │
//! │  ┌──────────────────────────┼─────────────────────────────┐  │
//! │  │       axum HTTP Server (port 8080)                     │  │
//! │  │  GET /             → Static HTML/JS                    │  │
//! │  │  GET /api/snapshot → JSON state                        │  │
//! │  │  GET /ws           → WebSocket upgrade                 │  │
//! │  │  GET /metrics      → Prometheus text                   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ontap_dashboard::{run_server, DashboardConfig, DashboardShell, DashboardState};
//!
//! let shell = Arc::new(DashboardShell::new());
//! let controller = Arc::new(DashboardSyncController::new(client, shell.clone()));
//! let dashboard_state = DashboardState::new(controller.clone(), shell);
//!
//! tokio::spawn(async move {
//!     if let Err(e) = run_server(dashboard_state, DashboardConfig::default(), token).await {
//!         tracing::error!(error = %e, "Dashboard server failed");
//!     }
//! });
//! ```

mod broadcast;
mod config;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use server::{create_router, run_server, AppState};
pub use state::{DashboardShell, DashboardState};
pub use types::{DashboardMessage, DashboardSnapshot, LocationSnapshot, TapSnapshot, ToastSnapshot};
