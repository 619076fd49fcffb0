//! Dashboard bootstrap and poller ownership.
//!
//! [`DashboardSyncController::bootstrap`] runs the chain
//! settings -> location -> tap list and then starts one [`TapPoller`] per
//! tap. Calling it again replaces the previous run: a chain that has been
//! superseded applies nothing and reports nothing.
//!
//! On a re-bootstrap of the same location with unchanged settings, pollers
//! for taps that are still listed keep running (their view state is kept),
//! pollers for taps that disappeared are stopped, and new taps get new
//! pollers. Any other re-bootstrap replaces every poller.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use ontap_client::ResourceClient;
use ontap_core::{
    Location, LocationIdentifier, RefreshSettings, SharedTapView, Tap, TapId, TapViewState,
};
use ontap_telemetry::Metrics;

use crate::error::{SyncError, SyncResult};
use crate::poller::{PollerHandle, TapPoller};
use crate::shell::ShellNotifier;

/// Literal prepended to every bootstrap toast.
pub const TOAST_PREFIX: &str = "Unable to load dashboard: ";

/// Result of a bootstrap call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// The chain completed and the dashboard now shows `location`.
    Ready { location: Location, tap_count: usize },
    /// A newer bootstrap (or a teardown) started while this one was in
    /// flight. Nothing was applied.
    Superseded,
}

/// Location and settings of the applied bootstrap.
#[derive(Debug, Clone)]
struct Session {
    location: Location,
    settings: RefreshSettings,
}

/// Everything the chain fetched.
struct Fetched {
    settings: RefreshSettings,
    location: Location,
    taps: Vec<Tap>,
}

/// Orchestrates bootstrap and owns all tap pollers.
pub struct DashboardSyncController {
    client: Arc<dyn ResourceClient>,
    shell: Arc<dyn ShellNotifier>,
    /// Bumped by every bootstrap and teardown.
    generation: AtomicU64,
    loading: AtomicBool,
    session: RwLock<Option<Session>>,
    /// Display list, sorted by tap number.
    taps: RwLock<Vec<SharedTapView>>,
    pollers: DashMap<TapId, PollerHandle>,
    /// Serializes applying a bootstrap result against teardown.
    apply_lock: Mutex<()>,
}

impl DashboardSyncController {
    pub fn new(client: Arc<dyn ResourceClient>, shell: Arc<dyn ShellNotifier>) -> Self {
        Self {
            client,
            shell,
            generation: AtomicU64::new(0),
            loading: AtomicBool::new(false),
            session: RwLock::new(None),
            taps: RwLock::new(Vec::new()),
            pollers: DashMap::new(),
            apply_lock: Mutex::new(()),
        }
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    /// Load the dashboard for `identifier` and start polling its taps.
    ///
    /// Failures are reported to the shell before being returned: a missing
    /// location asks the shell to navigate home, anything else raises a
    /// toast. A failed bootstrap leaves the previously applied dashboard
    /// (if any) running.
    pub async fn bootstrap(&self, identifier: &str) -> SyncResult<BootstrapOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.loading.store(true, Ordering::SeqCst);
        info!(identifier, generation, "Bootstrapping dashboard");

        let fetched = match self.fetch_chain(identifier, generation).await {
            Ok(Some(fetched)) => fetched,
            Ok(None) => return Ok(self.superseded(generation)),
            Err(e) => {
                if !self.is_current(generation) {
                    debug!(generation, error = %e, "Discarding failure of superseded bootstrap");
                    return Ok(self.superseded(generation));
                }
                self.loading.store(false, Ordering::SeqCst);
                self.report_failure(&e);
                return Err(e);
            }
        };

        let _guard = self.apply_lock.lock();
        if !self.is_current(generation) {
            return Ok(self.superseded(generation));
        }

        let location = fetched.location.clone();
        let tap_count = self.apply(fetched);
        self.loading.store(false, Ordering::SeqCst);
        self.shell.set_title(&location.dashboard_title());
        Metrics::bootstrap("ok");

        info!(
            location_id = %location.id,
            location = %location.name,
            tap_count,
            "Dashboard ready"
        );
        Ok(BootstrapOutcome::Ready {
            location,
            tap_count,
        })
    }

    /// Run the three fetches in order. `None` means the chain was
    /// superseded between steps.
    async fn fetch_chain(&self, identifier: &str, generation: u64) -> SyncResult<Option<Fetched>> {
        let identifier = LocationIdentifier::parse(identifier)?;

        let settings = self
            .client
            .get_refresh_settings()
            .await
            .map_err(SyncError::Settings)?;
        if !self.is_current(generation) {
            return Ok(None);
        }
        debug!(
            base_sec = settings.base_sec,
            variable_sec = settings.variable_sec,
            "Refresh settings loaded"
        );

        let location = self.client.get_location(&identifier).await.map_err(|e| {
            if e.is_not_found() {
                SyncError::LocationNotFound(e)
            } else {
                SyncError::Location(e)
            }
        })?;
        if !self.is_current(generation) {
            return Ok(None);
        }

        let taps = self
            .client
            .get_taps(&location.id)
            .await
            .map_err(SyncError::Taps)?;
        if !self.is_current(generation) {
            return Ok(None);
        }

        Ok(Some(Fetched {
            settings,
            location,
            taps,
        }))
    }

    /// Reconcile pollers with the fetched tap list and publish the view
    /// list. Returns the number of taps shown.
    fn apply(&self, fetched: Fetched) -> usize {
        let Fetched {
            settings,
            location,
            taps,
        } = fetched;

        let same_session = self
            .session
            .read()
            .as_ref()
            .is_some_and(|s| s.location.id == location.id && s.settings == settings);
        if !same_session {
            self.stop_all();
        }

        let mut seen = HashSet::with_capacity(taps.len());
        let mut views = Vec::with_capacity(taps.len());

        for tap in taps {
            if !seen.insert(tap.id.clone()) {
                warn!(tap_id = %tap.id, "Duplicate tap in tap list, ignoring");
                continue;
            }

            let existing = self.pollers.get(&tap.id).map(|h| h.view().clone());
            if let Some(view) = existing {
                // The listed record is newer than whatever the poller last saw.
                view.write().replace_tap(tap);
                views.push(view);
                continue;
            }

            let tap_id = tap.id.clone();
            let view = TapViewState::new(tap).into_shared();
            let handle = TapPoller::new(self.client.clone(), view.clone(), settings).spawn();
            self.pollers.insert(tap_id, handle);
            views.push(view);
        }

        self.pollers.retain(|tap_id, handle| {
            let keep = seen.contains(tap_id);
            if !keep {
                info!(tap_id = %tap_id, "Tap no longer listed, stopping poller");
                handle.stop();
            }
            keep
        });

        views.sort_by_key(|view| view.read().tap.tap_number);
        let count = views.len();

        *self.taps.write() = views;
        *self.session.write() = Some(Session { location, settings });
        count
    }

    fn report_failure(&self, error: &SyncError) {
        Metrics::bootstrap(error.stage());
        match error {
            SyncError::InvalidIdentifier(_) | SyncError::LocationNotFound(_) => {
                warn!(error = %error, "Location not found, navigating home");
                self.shell.navigate_home();
            }
            SyncError::Settings(e) | SyncError::Location(e) | SyncError::Taps(e) => {
                warn!(stage = error.stage(), error = %e, "Bootstrap failed");
                self.shell.toast(&format!("{TOAST_PREFIX}{}", e.message()));
            }
        }
    }

    fn superseded(&self, generation: u64) -> BootstrapOutcome {
        Metrics::bootstrap("superseded");
        debug!(generation, "Bootstrap superseded");
        BootstrapOutcome::Superseded
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Stop every poller and clear the dashboard. Any bootstrap still in
    /// flight is superseded.
    pub fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _guard = self.apply_lock.lock();
        self.stop_all();
        self.taps.write().clear();
        *self.session.write() = None;
        self.loading.store(false, Ordering::SeqCst);
        info!("Dashboard torn down");
    }

    /// [`teardown`](Self::teardown), then wait for every poller task to
    /// exit.
    pub async fn shutdown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let handles = {
            let _guard = self.apply_lock.lock();
            let ids: Vec<TapId> = self.pollers.iter().map(|e| e.key().clone()).collect();
            let handles: Vec<PollerHandle> = ids
                .iter()
                .filter_map(|id| self.pollers.remove(id).map(|(_, handle)| handle))
                .collect();
            self.taps.write().clear();
            *self.session.write() = None;
            self.loading.store(false, Ordering::SeqCst);
            handles
        };

        for handle in handles {
            handle.shutdown().await;
        }
        info!("Dashboard shut down");
    }

    fn stop_all(&self) {
        for entry in self.pollers.iter() {
            entry.value().stop();
        }
        self.pollers.clear();
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Location of the applied bootstrap.
    pub fn location(&self) -> Option<Location> {
        self.session.read().as_ref().map(|s| s.location.clone())
    }

    /// Settings snapshot the running pollers were started with.
    pub fn settings(&self) -> Option<RefreshSettings> {
        self.session.read().as_ref().map(|s| s.settings)
    }

    /// True while a bootstrap is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Shared view handles, sorted by tap number.
    pub fn taps(&self) -> Vec<SharedTapView> {
        self.taps.read().clone()
    }

    /// Point-in-time copy of every tap view, sorted by tap number.
    pub fn snapshot(&self) -> Vec<TapViewState> {
        self.taps.read().iter().map(|v| v.read().clone()).collect()
    }

    /// Number of running pollers.
    pub fn poller_count(&self) -> usize {
        self.pollers.len()
    }

    /// Whether a poller is running for `tap_id`.
    pub fn is_polling(&self, tap_id: &TapId) -> bool {
        self.pollers
            .get(tap_id)
            .is_some_and(|handle| !handle.is_stopped())
    }
}

impl Drop for DashboardSyncController {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::{RecordingShell, ShellEvent};
    use ontap_client::{ClientError, Endpoint, MockResourceClient};
    use tokio_test::{assert_err, assert_ok};

    fn location(id: &str) -> Location {
        Location {
            id: id.to_string(),
            name: format!("Location {id}"),
            description: format!("{id} taproom"),
        }
    }

    fn setup() -> (Arc<MockResourceClient>, Arc<RecordingShell>, DashboardSyncController) {
        let mock = Arc::new(MockResourceClient::new());
        let shell = Arc::new(RecordingShell::new());
        let controller = DashboardSyncController::new(mock.clone(), shell.clone());
        (mock, shell, controller)
    }

    #[tokio::test]
    async fn test_invalid_identifier_navigates_home() {
        let (mock, shell, controller) = setup();

        let err = assert_err!(controller.bootstrap("   ").await);
        assert!(matches!(err, SyncError::InvalidIdentifier(_)));
        assert_eq!(shell.events(), vec![ShellEvent::NavigateHome]);
        assert!(mock.call_log().is_empty());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_settings_failure_toasts_and_stops_chain() {
        let (mock, shell, controller) = setup();
        mock.set_settings(Err(ClientError::Status {
            status: 503,
            message: "maintenance".to_string(),
        }));

        let err = assert_err!(controller.bootstrap("downtown").await);
        assert_eq!(err.stage(), "settings_failed");
        assert_eq!(shell.toasts(), vec![format!("{TOAST_PREFIX}maintenance")]);
        assert_eq!(shell.navigations(), 0);
        assert_eq!(mock.calls(Endpoint::Location), 0);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_taps_failure_toasts() {
        let (mock, shell, controller) = setup();
        mock.set_settings(Ok(RefreshSettings::new(60, 0).unwrap()));
        mock.set_location("downtown", Ok(location("L1")));
        mock.set_taps(
            "L1",
            Err(ClientError::Transport("connection refused".to_string())),
        );

        let err = controller.bootstrap("downtown").await.unwrap_err();
        assert_eq!(err.stage(), "taps_failed");
        assert_eq!(shell.toasts(), vec![format!("{TOAST_PREFIX}connection refused")]);
        assert!(shell.titles().is_empty());
        assert!(controller.location().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_taps_get_one_poller() {
        let (mock, _shell, controller) = setup();
        mock.set_settings(Ok(RefreshSettings::new(60, 0).unwrap()));
        mock.set_location("downtown", Ok(location("L1")));
        mock.set_taps("L1", Ok(vec![Tap::new("t1", 1), Tap::new("t1", 1)]));
        mock.set_tap(Tap::new("t1", 1));

        let outcome = assert_ok!(controller.bootstrap("downtown").await);
        assert!(matches!(outcome, BootstrapOutcome::Ready { tap_count: 1, .. }));
        assert_eq!(controller.poller_count(), 1);
        controller.shutdown().await;
    }

    #[tokio::test]
    async fn test_teardown_clears_state() {
        let (mock, _shell, controller) = setup();
        mock.set_settings(Ok(RefreshSettings::new(60, 0).unwrap()));
        mock.set_location("downtown", Ok(location("L1")));
        mock.set_taps("L1", Ok(vec![Tap::new("t1", 1), Tap::new("t2", 2)]));

        controller.bootstrap("downtown").await.unwrap();
        assert_eq!(controller.poller_count(), 2);
        assert!(controller.is_polling(&TapId::new("t1")));

        controller.teardown();
        assert_eq!(controller.poller_count(), 0);
        assert!(controller.taps().is_empty());
        assert!(controller.location().is_none());
        assert!(controller.settings().is_none());
    }
}
