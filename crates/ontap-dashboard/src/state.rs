//! Dashboard state management.
//!
//! [`DashboardShell`] receives the sync engine's outbound notifications
//! (title, toast, navigate home) and keeps the latest of each.
//! [`DashboardState`] combines it with the controller's tap views into
//! snapshots for the REST and WebSocket APIs.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

use ontap_sync::{DashboardSyncController, ShellNotifier};

use crate::types::{DashboardSnapshot, LocationSnapshot, TapSnapshot, ToastSnapshot};

#[derive(Debug, Default)]
struct ShellView {
    title: Option<String>,
    last_toast: Option<ToastSnapshot>,
    toast_seq: u64,
    navigate_home: bool,
    navigate_home_seq: u64,
}

/// Shell notifier backing the web dashboard.
#[derive(Debug, Default)]
pub struct DashboardShell {
    view: RwLock<ShellView>,
}

impl DashboardShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> Option<String> {
        self.view.read().title.clone()
    }

    pub fn last_toast(&self) -> Option<ToastSnapshot> {
        self.view.read().last_toast.clone()
    }

    /// Whether the engine asked to leave the dashboard.
    pub fn navigate_home_requested(&self) -> bool {
        self.view.read().navigate_home
    }

    /// Number of navigate-home requests so far. Changes on every request,
    /// even when one is already pending.
    pub fn navigate_home_seq(&self) -> u64 {
        self.view.read().navigate_home_seq
    }
}

impl ShellNotifier for DashboardShell {
    fn set_title(&self, title: &str) {
        info!(title, "Dashboard title updated");
        let mut view = self.view.write();
        view.title = Some(title.to_string());
        // A successful bootstrap means we are on a valid dashboard again.
        view.navigate_home = false;
    }

    fn toast(&self, message: &str) {
        warn!(message, "Dashboard toast");
        let mut view = self.view.write();
        view.toast_seq += 1;
        view.last_toast = Some(ToastSnapshot {
            seq: view.toast_seq,
            timestamp_ms: Utc::now().timestamp_millis(),
            message: message.to_string(),
        });
    }

    fn navigate_home(&self) {
        warn!("Location not found, dashboard will navigate home");
        let mut view = self.view.write();
        view.navigate_home = true;
        view.navigate_home_seq += 1;
    }
}

/// Dashboard state that aggregates the controller and shell.
#[derive(Clone)]
pub struct DashboardState {
    /// Sync controller owning the tap views.
    controller: Arc<DashboardSyncController>,
    /// Shell notifications.
    shell: Arc<DashboardShell>,
}

impl DashboardState {
    pub fn new(controller: Arc<DashboardSyncController>, shell: Arc<DashboardShell>) -> Self {
        Self { controller, shell }
    }

    pub fn controller(&self) -> &Arc<DashboardSyncController> {
        &self.controller
    }

    pub fn shell(&self) -> &Arc<DashboardShell> {
        &self.shell
    }

    /// Collect a full snapshot of the current state.
    pub fn collect_snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            title: self.shell.title(),
            location: self.controller.location().as_ref().map(LocationSnapshot::from),
            loading: self.controller.is_loading(),
            taps: self.collect_taps(),
            last_toast: self.shell.last_toast(),
            navigate_home: self.shell.navigate_home_requested(),
        }
    }

    /// Collect tap rows, sorted by tap number.
    pub fn collect_taps(&self) -> Vec<TapSnapshot> {
        self.controller
            .taps()
            .iter()
            .map(|view| TapSnapshot::from(&*view.read()))
            .collect()
    }
}

impl std::fmt::Debug for DashboardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardState")
            .field("location", &self.controller.location().map(|l| l.id))
            .field("pollers", &self.controller.poller_count())
            .field("loading", &self.controller.is_loading())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontap_client::MockResourceClient;
    use ontap_core::{Location, RefreshSettings, Tap};
    use tokio_test::assert_ok;

    #[test]
    fn test_shell_records_latest_toast() {
        let shell = DashboardShell::new();
        shell.toast("first");
        shell.toast("second");

        let toast = shell.last_toast().unwrap();
        assert_eq!(toast.seq, 2);
        assert_eq!(toast.message, "second");
    }

    #[test]
    fn test_title_clears_navigate_home() {
        let shell = DashboardShell::new();
        shell.navigate_home();
        assert!(shell.navigate_home_requested());

        shell.set_title("On Tap: Downtown");
        assert!(!shell.navigate_home_requested());
        assert_eq!(shell.title().as_deref(), Some("On Tap: Downtown"));
    }

    #[test]
    fn test_every_navigate_home_bumps_seq() {
        let shell = DashboardShell::new();
        assert_eq!(shell.navigate_home_seq(), 0);

        shell.navigate_home();
        shell.navigate_home();
        assert!(shell.navigate_home_requested());
        assert_eq!(shell.navigate_home_seq(), 2);

        // Clearing the flag keeps the counter.
        shell.set_title("On Tap: Downtown");
        assert_eq!(shell.navigate_home_seq(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_after_bootstrap() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_settings(Ok(RefreshSettings::new(300, 150).unwrap()));
        mock.set_location(
            "downtown",
            Ok(Location {
                id: "L1".to_string(),
                name: "Downtown Taproom".to_string(),
                description: "Downtown".to_string(),
            }),
        );
        mock.set_taps("L1", Ok(vec![Tap::new("t2", 2), Tap::new("t1", 1)]));

        let shell = Arc::new(DashboardShell::new());
        let controller = Arc::new(DashboardSyncController::new(mock, shell.clone()));
        let state = DashboardState::new(controller.clone(), shell);

        assert_ok!(controller.bootstrap("downtown").await);
        let snapshot = state.collect_snapshot();

        assert_eq!(snapshot.title.as_deref(), Some("On Tap: Downtown"));
        assert_eq!(snapshot.location.unwrap().id, "L1");
        assert!(!snapshot.loading);
        let numbers: Vec<u32> = snapshot.taps.iter().map(|t| t.tap_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert!(snapshot.last_toast.is_none());

        controller.shutdown().await;
    }
}
