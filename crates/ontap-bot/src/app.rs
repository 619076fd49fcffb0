//! Main application orchestration.
//!
//! Coordinates:
//! - Dashboard bootstrap for the configured location
//! - Periodic re-bootstrap
//! - Dashboard server
//! - Shutdown (all pollers stopped before exit)

use std::sync::Arc;
use std::time::Duration;

use ontap_client::{HttpResourceClient, ResourceClient};
use ontap_dashboard::{run_server, DashboardShell, DashboardState};
use ontap_sync::{BootstrapOutcome, DashboardSyncController};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Main application.
pub struct Application {
    config: AppConfig,
    controller: Arc<DashboardSyncController>,
    dashboard_state: DashboardState,
}

impl Application {
    /// Create the application against the configured HTTP backend.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let client = HttpResourceClient::new(config.http_client_config())?;
        Ok(Self::with_client(config, Arc::new(client)))
    }

    /// Create the application against any backend client.
    pub fn with_client(config: AppConfig, client: Arc<dyn ResourceClient>) -> Self {
        let shell = Arc::new(DashboardShell::new());
        let controller = Arc::new(DashboardSyncController::new(client, shell.clone()));
        let dashboard_state = DashboardState::new(controller.clone(), shell);

        Self {
            config,
            controller,
            dashboard_state,
        }
    }

    pub fn controller(&self) -> &Arc<DashboardSyncController> {
        &self.controller
    }

    pub fn dashboard_state(&self) -> &DashboardState {
        &self.dashboard_state
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
            signal.cancel();
        });

        self.run_until(shutdown).await
    }

    /// Run until `shutdown` is cancelled, then stop every poller.
    pub async fn run_until(self, shutdown: CancellationToken) -> AppResult<()> {
        let server = self.spawn_dashboard(&shutdown);

        let mut rebootstrap = self.config.rebootstrap_interval().map(rebootstrap_ticker);
        self.bootstrap_until(&shutdown).await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = next_tick(rebootstrap.as_mut()) => {
                    info!(location = %self.config.location, "Re-bootstrapping dashboard");
                    self.bootstrap_until(&shutdown).await;
                }
            }
        }

        info!("Stopping tap pollers");
        self.controller.shutdown().await;

        if let Some(server) = server {
            match server.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(AppError::Dashboard(e.to_string())),
                Err(e) => return Err(AppError::Dashboard(format!("server task failed: {e}"))),
            }
        }

        info!("Shutdown complete");
        Ok(())
    }

    /// One bootstrap, abandoned if shutdown comes first. Failures have
    /// already been reported to the shell, so they are only logged here.
    async fn bootstrap_until(&self, shutdown: &CancellationToken) {
        tokio::select! {
            _ = shutdown.cancelled() => {}
            result = self.controller.bootstrap(&self.config.location) => match result {
                Ok(BootstrapOutcome::Ready { location, tap_count }) => {
                    info!(location = %location.name, tap_count, "Dashboard bootstrapped");
                }
                Ok(BootstrapOutcome::Superseded) => {}
                Err(e) => {
                    warn!(stage = e.stage(), error = %e, "Dashboard bootstrap failed");
                }
            }
        }
    }

    fn spawn_dashboard(
        &self,
        shutdown: &CancellationToken,
    ) -> Option<JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>> {
        if !self.config.dashboard.enabled {
            info!("Dashboard server disabled");
            return None;
        }

        Some(tokio::spawn(run_server(
            self.dashboard_state.clone(),
            self.config.dashboard.clone(),
            shutdown.clone(),
        )))
    }
}

fn rebootstrap_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontap_client::{Endpoint, MockResourceClient};
    use ontap_core::{Location, RefreshSettings, Tap};

    fn config(rebootstrap_interval_secs: u64) -> AppConfig {
        let mut config = AppConfig {
            location: "downtown".to_string(),
            rebootstrap_interval_secs,
            ..Default::default()
        };
        config.dashboard.enabled = false;
        config
    }

    fn backend() -> Arc<MockResourceClient> {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_settings(Ok(RefreshSettings::new(60, 0).unwrap()));
        mock.set_location(
            "downtown",
            Ok(Location {
                id: "L1".to_string(),
                name: "Downtown Taproom".to_string(),
                description: "Downtown".to_string(),
            }),
        );
        mock.set_taps("L1", Ok(vec![Tap::new("t1", 1)]));
        mock.set_tap(Tap::new("t1", 1));
        mock
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(Application::new(AppConfig::default()).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_bootstraps_and_rebootstraps() {
        let mock = backend();
        let app = Application::with_client(config(300), mock.clone());
        let controller = app.controller().clone();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(app.run_until(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(mock.calls(Endpoint::Settings), 1);
        assert_eq!(controller.poller_count(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(mock.calls(Endpoint::Settings), 2);
        // Same location and settings: the poller is kept.
        assert_eq!(controller.poller_count(), 1);

        shutdown.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(controller.poller_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_bootstrap_keeps_running() {
        let mock = Arc::new(MockResourceClient::new());
        let app = Application::with_client(config(0), mock.clone());
        let state = app.dashboard_state().clone();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(app.run_until(shutdown.clone()));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let toast = state.shell().last_toast().unwrap();
        assert!(toast.message.starts_with(ontap_sync::TOAST_PREFIX));

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }
}
