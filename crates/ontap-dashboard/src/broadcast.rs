//! WebSocket broadcast functionality.
//!
//! The broadcaster collects state updates at a fixed interval and broadcasts
//! them to all connected WebSocket clients. Toasts and navigate-home
//! requests are sent as separate messages the first time they are seen.

use std::time::Duration;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::DashboardState;
use crate::types::DashboardMessage;

/// Run the broadcaster task until `shutdown` is cancelled.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    interval_ms: u64,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));

    // Change detection for one-shot messages
    let mut last_toast_seq = state.shell().last_toast().map_or(0, |t| t.seq);
    let mut last_navigate_seq = state.shell().navigate_home_seq();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Broadcaster stopped");
                return;
            }
            _ = interval.tick() => {}
        }

        if let Some(toast) = state.shell().last_toast() {
            if toast.seq != last_toast_seq {
                last_toast_seq = toast.seq;
                send(&tx, &DashboardMessage::Toast(toast));
            }
        }

        let navigate_seq = state.shell().navigate_home_seq();
        if navigate_seq != last_navigate_seq {
            last_navigate_seq = navigate_seq;
            send(
                &tx,
                &DashboardMessage::NavigateHome {
                    seq: navigate_seq,
                    timestamp_ms: chrono::Utc::now().timestamp_millis(),
                },
            );
        }

        let snapshot = state.collect_snapshot();
        send(
            &tx,
            &DashboardMessage::Update {
                timestamp_ms: snapshot.timestamp_ms,
                title: snapshot.title,
                loading: snapshot.loading,
                taps: snapshot.taps,
            },
        );
    }
}

fn send(tx: &broadcast::Sender<String>, msg: &DashboardMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => match tx.send(json) {
            Ok(n) => {
                trace!(receivers = n, "Broadcast update sent");
            }
            Err(_) => {
                // No receivers - this is normal when no clients connected
                trace!("No WebSocket receivers connected");
            }
        },
        Err(e) => {
            debug!(error = %e, "Failed to serialize dashboard update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::DashboardShell;
    use ontap_client::MockResourceClient;
    use ontap_sync::{DashboardSyncController, ShellNotifier};
    use std::sync::Arc;

    fn state() -> DashboardState {
        let shell = Arc::new(DashboardShell::new());
        let controller = Arc::new(DashboardSyncController::new(
            Arc::new(MockResourceClient::new()),
            shell.clone(),
        ));
        DashboardState::new(controller, shell)
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_sent_once() {
        let state = state();
        let (tx, mut rx) = broadcast::channel::<String>(16);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_broadcaster(state.clone(), tx, 1000, shutdown.clone()));

        // First tick is immediate: one update.
        let first = rx.recv().await.unwrap();
        assert!(first.contains("\"type\":\"update\""));

        state.shell().toast("Unable to load dashboard: offline");
        let toast = rx.recv().await.unwrap();
        assert!(toast.contains("\"type\":\"toast\""));
        assert!(rx.recv().await.unwrap().contains("\"type\":\"update\""));

        // No repeat on the following tick.
        let next = rx.recv().await.unwrap();
        assert!(next.contains("\"type\":\"update\""));

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigate_home_sent_per_request() {
        let state = state();
        let (tx, mut rx) = broadcast::channel::<String>(16);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(run_broadcaster(state.clone(), tx, 1000, shutdown.clone()));
        assert!(rx.recv().await.unwrap().contains("\"type\":\"update\""));

        state.shell().navigate_home();
        let first = rx.recv().await.unwrap();
        assert!(first.contains("\"type\":\"navigate_home\""));
        assert!(first.contains("\"seq\":1"));
        assert!(rx.recv().await.unwrap().contains("\"type\":\"update\""));

        // A second not-found while the first is still pending is sent again.
        state.shell().navigate_home();
        let second = rx.recv().await.unwrap();
        assert!(second.contains("\"type\":\"navigate_home\""));
        assert!(second.contains("\"seq\":2"));
        assert!(rx.recv().await.unwrap().contains("\"type\":\"update\""));

        // Nothing new, nothing resent.
        assert!(rx.recv().await.unwrap().contains("\"type\":\"update\""));

        shutdown.cancel();
        task.await.unwrap();
    }
}
