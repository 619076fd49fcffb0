//! Dashboard data synchronization engine for OnTap.
//!
//! Bootstraps a location's dashboard through a chain of remote fetches and
//! keeps every tap's view state current with one independently scheduled
//! poller per tap.
//!
//! # Architecture
//!
//! ```text
//! DashboardSyncController
//!   bootstrap: settings -> location -> tap list
//!   for each tap: TapPoller::spawn() -> PollerHandle
//!
//! TapPoller (one task per tap, runs until stopped)
//!   loop:
//!     tap fetch -> classify
//!       beer/beverage metadata   } concurrently
//!       sensor -> 3 metric fetches}
//!     sleep(JitterScheduler::delay_with_rng(own rng))
//! ```
//!
//! Failures inside a poll cycle are silent: the affected field is left as
//! it was and the loop retries on its next natural cycle. Bootstrap failures
//! are reported to the surrounding shell as a toast, or as a navigate-home
//! request when the location does not exist.

pub mod controller;
pub mod error;
pub mod jitter;
pub mod poller;
pub mod shell;

pub use controller::{BootstrapOutcome, DashboardSyncController, TOAST_PREFIX};
pub use error::{SyncError, SyncResult};
pub use jitter::JitterScheduler;
pub use poller::{CycleOutcome, PollerHandle, TapPoller};
pub use shell::{LoggingShell, RecordingShell, ShellEvent, ShellNotifier};
