//! Per-tap polling loop.
//!
//! Each [`TapPoller`] keeps exactly one [`SharedTapView`] current. A cycle:
//!
//! 1. fetch the tap record and replace it in place;
//! 2. classify the binding;
//! 3. empty taps stop here;
//! 4. bound taps resolve beverage metadata, while
//! 5. taps with a sensor fetch the sensor, then its three metrics
//!    concurrently;
//! 6. wait a jittered delay and start over.
//!
//! Failures are silent: the field they would have written keeps its old
//! value and nothing chained from them runs this cycle. There are no
//! immediate retries; the next natural cycle is the retry.
//!
//! Each sensor metric clears `is_loading` as soon as it lands. With three
//! metrics in flight the flag can therefore turn false before the other two
//! have resolved; it is always false once all three have succeeded.

use std::sync::Arc;

use ontap_client::{ClientError, ResourceClient};
use ontap_core::{normalize_last_updated_on, RefreshSettings, SharedTapView, TapBinding, TapId};
use ontap_telemetry::Metrics;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::jitter::JitterScheduler;

/// What a single poll cycle ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The tap fetch failed; nothing was updated.
    TapFetchFailed,
    /// The tap is empty; no sub-fetches were made.
    Empty,
    /// The tap is bound; sub-fetches ran (each may have failed silently).
    Refreshed { binding: &'static str },
}

/// Owned handle to a running poller.
///
/// Stopping cancels the loop at its next await point; in-flight fetches are
/// dropped. Dropping the handle stops the poller as well.
#[derive(Debug)]
pub struct PollerHandle {
    tap_id: TapId,
    view: SharedTapView,
    token: CancellationToken,
    join: Option<JoinHandle<()>>,
}

impl PollerHandle {
    pub fn tap_id(&self) -> &TapId {
        &self.tap_id
    }

    /// The view state this poller writes.
    pub fn view(&self) -> &SharedTapView {
        &self.view
    }

    /// Request the loop to stop.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            debug!(tap_id = %self.tap_id, "Stopping tap poller");
            self.token.cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stop the loop and wait for the task to exit.
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Self-rescheduling poller for one tap.
pub struct TapPoller {
    client: Arc<dyn ResourceClient>,
    view: SharedTapView,
    scheduler: JitterScheduler,
    rng: StdRng,
    tap_id: TapId,
}

impl TapPoller {
    /// Create a poller for the tap wrapped by `view`.
    ///
    /// `settings` is the snapshot captured at bootstrap; the poller never
    /// re-reads it.
    pub fn new(
        client: Arc<dyn ResourceClient>,
        view: SharedTapView,
        settings: RefreshSettings,
    ) -> Self {
        let tap_id = view.read().tap.id.clone();
        Self {
            client,
            view,
            scheduler: JitterScheduler::new(settings),
            rng: StdRng::from_entropy(),
            tap_id,
        }
    }

    /// Draw delays from a fixed seed instead of OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Start the loop on the current tokio runtime. The first cycle runs
    /// immediately.
    #[must_use = "dropping the handle stops the poller"]
    pub fn spawn(self) -> PollerHandle {
        let token = CancellationToken::new();
        let tap_id = self.tap_id.clone();
        let view = self.view.clone();
        let join = tokio::spawn(self.run(token.clone()));

        PollerHandle {
            tap_id,
            view,
            token,
            join: Some(join),
        }
    }

    async fn run(mut self, token: CancellationToken) {
        let _active = Metrics::poller_active();
        info!(tap_id = %self.tap_id, "Tap poller started");

        loop {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };
            Metrics::poll_cycle(outcome != CycleOutcome::TapFetchFailed);

            let delay = self.scheduler.delay_with_rng(&mut self.rng);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            Metrics::poll_delay(delay_ms);
            trace!(tap_id = %self.tap_id, ?outcome, delay_ms, "Next poll scheduled");

            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!(tap_id = %self.tap_id, "Tap poller stopped");
    }

    /// Run one cycle against the backend.
    pub async fn poll_once(&self) -> CycleOutcome {
        let tap = match self.client.get_tap(&self.tap_id).await {
            Ok(tap) => tap,
            Err(e) => {
                self.fetch_failed("tap", None, &e);
                return CycleOutcome::TapFetchFailed;
            }
        };

        let (binding, sensor_id) = {
            let mut view = self.view.write();
            view.replace_tap(tap);
            let binding = view.binding();
            view.is_loading = binding != TapBinding::Empty;
            (binding, view.tap.sensor_id().map(str::to_string))
        };

        if binding == TapBinding::Empty {
            return CycleOutcome::Empty;
        }

        tokio::join!(
            self.resolve_beverage(&binding),
            self.resolve_sensor(sensor_id.as_deref()),
        );

        CycleOutcome::Refreshed {
            binding: binding.label(),
        }
    }

    async fn resolve_beverage(&self, binding: &TapBinding) {
        match binding {
            TapBinding::Beer { beer_id: id } | TapBinding::Beverage { beverage_id: id } => {
                match self.client.get_beverage_metadata(id).await {
                    Ok(metadata) => {
                        let mut view = self.view.write();
                        view.beverage = Some(metadata);
                        view.is_loading = false;
                    }
                    Err(e) => self.fetch_failed("beverage", Some(id.as_str()), &e),
                }
            }
            TapBinding::ColdBrew => {
                // No metadata source for cold brew yet.
                self.view.write().is_loading = false;
            }
            TapBinding::Batch { .. } => {
                self.view.write().is_loading = false;
            }
            TapBinding::Empty => {}
        }
    }

    async fn resolve_sensor(&self, sensor_id: Option<&str>) {
        let Some(sensor_id) = sensor_id else {
            return;
        };

        let identity = match self.client.get_sensor(sensor_id).await {
            Ok(identity) => identity,
            Err(e) => {
                self.fetch_failed("sensor", Some(sensor_id), &e);
                return;
            }
        };

        {
            let mut view = self.view.write();
            view.sensor_mut().last_updated_on =
                normalize_last_updated_on(identity.last_updated_on.as_ref());
        }

        let percent = async {
            match self.client.get_sensor_percent_remaining(sensor_id).await {
                Ok(value) => {
                    let mut view = self.view.write();
                    view.sensor_mut().set_percent_remaining(value);
                    view.is_loading = false;
                }
                Err(e) => self.fetch_failed("percent_remaining", Some(sensor_id), &e),
            }
        };

        let total = async {
            match self.client.get_sensor_total_remaining(sensor_id).await {
                Ok(value) => {
                    let mut view = self.view.write();
                    view.sensor_mut().set_total_remaining(value);
                    view.is_loading = false;
                }
                Err(e) => self.fetch_failed("total_remaining", Some(sensor_id), &e),
            }
        };

        let unit = async {
            match self.client.get_sensor_unit(sensor_id).await {
                Ok(value) => {
                    let mut view = self.view.write();
                    view.sensor_mut().set_unit(value);
                    view.is_loading = false;
                }
                Err(e) => self.fetch_failed("unit", Some(sensor_id), &e),
            }
        };

        tokio::join!(percent, total, unit);
    }

    fn fetch_failed(&self, resource: &'static str, key: Option<&str>, error: &ClientError) {
        Metrics::fetch_failed(resource, error.classification());
        debug!(
            tap_id = %self.tap_id,
            resource,
            key,
            classification = error.classification(),
            error = %error,
            "Poll fetch failed, retrying next cycle"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontap_client::{Endpoint, MockResourceClient};
    use ontap_core::{BeverageMetadata, SensorIdentity, Tap, TapViewState};
    use std::time::Duration;
    use tokio::time::{sleep_until, Instant};

    fn settings() -> RefreshSettings {
        RefreshSettings::new(300, 150).unwrap()
    }

    fn beer_tap(id: &str, number: u32, beer: &str, sensor: Option<&str>) -> Tap {
        Tap {
            beer_id: Some(beer.to_string()),
            sensor_id: sensor.map(String::from),
            ..Tap::new(id, number)
        }
    }

    fn sensor(id: &str) -> SensorIdentity {
        SensorIdentity {
            id: id.to_string(),
            name: format!("sensor {id}"),
            last_updated_on: Some(serde_json::json!(1705315200)),
        }
    }

    fn poller_for(mock: &Arc<MockResourceClient>, tap: Tap) -> (TapPoller, SharedTapView) {
        let view = TapViewState::new(tap).into_shared();
        let client: Arc<dyn ResourceClient> = mock.clone();
        (TapPoller::new(client, view.clone(), settings()), view)
    }

    fn script_sensor(mock: &MockResourceClient, id: &str, percent: f64) {
        mock.set_sensor(id, Ok(sensor(id)));
        mock.set_percent_remaining(id, Ok(percent));
        mock.set_total_remaining(id, Ok(3.5));
        mock.set_unit(id, Ok("gal".to_string()));
    }

    #[tokio::test]
    async fn test_empty_tap_skips_sub_fetches() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(Tap::new("t1", 1));
        let (poller, view) = poller_for(&mock, Tap::new("t1", 1));

        assert_eq!(poller.poll_once().await, CycleOutcome::Empty);
        let view = view.read();
        assert!(view.is_empty);
        assert!(!view.is_loading);
        assert_eq!(mock.calls(Endpoint::Beverage), 0);
        assert_eq!(mock.calls(Endpoint::Sensor), 0);
    }

    #[tokio::test]
    async fn test_beer_tap_with_sensor_resolves_everything() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(beer_tap("t2", 2, "B1", Some("S1")));
        mock.set_beverage("B1", Ok(BeverageMetadata::named("B1", "Pilsner")));
        script_sensor(&mock, "S1", 62.0);
        let (poller, view) = poller_for(&mock, Tap::new("t2", 2));

        let outcome = poller.poll_once().await;
        assert_eq!(outcome, CycleOutcome::Refreshed { binding: "beer" });

        let view = view.read();
        assert!(!view.is_empty);
        assert!(!view.is_loading);
        assert_eq!(view.beverage.as_ref().unwrap().name, "Pilsner");
        let sensor = view.sensor.as_ref().unwrap();
        assert_eq!(sensor.percent_remaining, 62.0);
        assert_eq!(sensor.total_remaining, 3.5);
        assert_eq!(sensor.unit, "gal");
        assert!(sensor.last_updated_on.is_some());
    }

    #[tokio::test]
    async fn test_beverage_tap_fetches_by_beverage_id() {
        let mock = Arc::new(MockResourceClient::new());
        let tap = Tap {
            beverage_id: Some("V7".to_string()),
            ..Tap::new("t3", 3)
        };
        mock.set_tap(tap.clone());
        mock.set_beverage("V7", Ok(BeverageMetadata::named("V7", "Kombucha")));
        let (poller, view) = poller_for(&mock, tap);

        poller.poll_once().await;
        assert_eq!(mock.calls_for(Endpoint::Beverage, "V7"), 1);
        assert_eq!(view.read().beverage.as_ref().unwrap().name, "Kombucha");
        assert!(!view.read().is_loading);
    }

    #[tokio::test]
    async fn test_cold_brew_is_explicit_no_op() {
        let mock = Arc::new(MockResourceClient::new());
        let tap = Tap {
            tap_type: Some("cold-brew".to_string()),
            ..beer_tap("t4", 4, "B9", None)
        };
        mock.set_tap(tap.clone());
        let (poller, view) = poller_for(&mock, tap);

        assert_eq!(
            poller.poll_once().await,
            CycleOutcome::Refreshed {
                binding: "cold_brew"
            }
        );
        assert_eq!(mock.calls(Endpoint::Beverage), 0);
        assert!(!view.read().is_loading);
        assert!(!view.read().is_empty);
    }

    #[tokio::test]
    async fn test_tap_fetch_failure_leaves_view_untouched() {
        let mock = Arc::new(MockResourceClient::new());
        let tap = beer_tap("t5", 5, "B1", Some("S1"));
        let (poller, view) = poller_for(&mock, tap.clone());
        let before = view.read().clone();

        assert_eq!(poller.poll_once().await, CycleOutcome::TapFetchFailed);
        assert_eq!(*view.read(), before);
        assert_eq!(mock.calls(Endpoint::Beverage), 0);
        assert_eq!(mock.calls(Endpoint::Sensor), 0);
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_metric_fetches() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(beer_tap("t6", 6, "B1", Some("S404")));
        mock.set_beverage("B1", Ok(BeverageMetadata::named("B1", "Stout")));
        let (poller, view) = poller_for(&mock, Tap::new("t6", 6));

        poller.poll_once().await;
        assert_eq!(mock.calls(Endpoint::PercentRemaining), 0);
        assert_eq!(mock.calls(Endpoint::TotalRemaining), 0);
        assert_eq!(mock.calls(Endpoint::Unit), 0);
        assert!(view.read().sensor.is_none());
        assert_eq!(view.read().beverage.as_ref().unwrap().name, "Stout");
    }

    #[tokio::test]
    async fn test_one_metric_failure_keeps_others() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(beer_tap("t7", 7, "B1", Some("S1")));
        script_sensor(&mock, "S1", 10.0);
        mock.set_unit(
            "S1",
            Err(ClientError::Status {
                status: 500,
                message: "unit lookup failed".to_string(),
            }),
        );
        let (poller, view) = poller_for(&mock, Tap::new("t7", 7));

        poller.poll_once().await;
        let view = view.read();
        let sensor = view.sensor.as_ref().unwrap();
        assert_eq!(sensor.percent_remaining, 10.0);
        assert!(sensor.unit.is_empty());
        assert!(!view.is_loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_metric_clears_loading_before_others_resolve() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(beer_tap("t8", 8, "B1", Some("S1")));
        script_sensor(&mock, "S1", 80.0);
        // Beverage never resolves, so only the metrics touch the flag.
        mock.set_beverage(
            "B1",
            Err(ClientError::Transport("connection reset".to_string())),
        );
        mock.set_latency(Endpoint::PercentRemaining, Duration::from_secs(1));
        mock.set_latency(Endpoint::TotalRemaining, Duration::from_secs(5));
        mock.set_latency(Endpoint::Unit, Duration::from_secs(10));
        let (poller, view) = poller_for(&mock, Tap::new("t8", 8));

        let cycle = tokio::spawn(async move { poller.poll_once().await });

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(view.read().is_loading);

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        {
            let view = view.read();
            assert!(!view.is_loading, "first metric should clear loading");
            assert_eq!(view.sensor.as_ref().unwrap().percent_remaining, 80.0);
            assert!(view.sensor.as_ref().unwrap().unit.is_empty());
        }

        cycle.await.unwrap();
        let view = view.read();
        assert!(!view.is_loading);
        assert_eq!(view.sensor.as_ref().unwrap().unit, "gal");
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poller_reschedules_within_window() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(Tap::new("t9", 9));
        let (poller, _view) = poller_for(&mock, Tap::new("t9", 9));

        let handle = poller.spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(mock.calls_for(Endpoint::Tap, "t9"), 1);

        // Earliest possible refire is 150s, latest 450s.
        tokio::time::sleep(Duration::from_secs(140)).await;
        assert_eq!(mock.calls_for(Endpoint::Tap, "t9"), 1);
        tokio::time::sleep(Duration::from_secs(311)).await;
        assert!(mock.calls_for(Endpoint::Tap, "t9") >= 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_still_reschedules() {
        let mock = Arc::new(MockResourceClient::new());
        let (poller, _view) = poller_for(&mock, Tap::new("gone", 1));

        let handle = poller.spawn();
        tokio::time::sleep(Duration::from_secs(451)).await;
        assert!(mock.calls_for(Endpoint::Tap, "gone") >= 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(Tap::new("t10", 10));
        let (poller, _view) = poller_for(&mock, Tap::new("t10", 10));

        let handle = poller.spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.stop();
        assert!(handle.is_stopped());

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(mock.calls_for(Endpoint::Tap, "t10"), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_poller() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(Tap::new("t11", 11));
        let (poller, _view) = poller_for(&mock, Tap::new("t11", 11));

        let handle = poller.spawn();
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert_eq!(mock.calls_for(Endpoint::Tap, "t11"), 1);
    }

    fn jittered() -> RefreshSettings {
        RefreshSettings::new(60, 30).unwrap()
    }

    /// The first `n` delays a poller seeded with `seed` will wait.
    fn seeded_delays(seed: u64, n: usize) -> Vec<Duration> {
        let scheduler = JitterScheduler::new(jittered());
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| scheduler.delay_with_rng(&mut rng)).collect()
    }

    fn seeded_poller(mock: &Arc<MockResourceClient>, id: &str, seed: u64) -> PollerHandle {
        let view = TapViewState::new(Tap::new(id, 1)).into_shared();
        let client: Arc<dyn ResourceClient> = mock.clone();
        TapPoller::new(client, view, jittered()).with_seed(seed).spawn()
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_settings_pollers_schedule_independently() {
        let mock = Arc::new(MockResourceClient::new());
        mock.set_tap(Tap::new("steady", 1));
        // "flaky" is never scripted, so every one of its cycles fails.

        let steady_seed = 1;
        let steady_delays = seeded_delays(steady_seed, 2);
        let steady_fires = [steady_delays[0], steady_delays[0] + steady_delays[1]];
        let flaky_seed = (2..)
            .find(|seed| !steady_fires.contains(&seeded_delays(*seed, 1)[0]))
            .unwrap();
        let flaky_delay = seeded_delays(flaky_seed, 1)[0];
        assert_ne!(steady_delays[0], flaky_delay);

        let start = Instant::now();
        let steady = seeded_poller(&mock, "steady", steady_seed);
        let flaky = seeded_poller(&mock, "flaky", flaky_seed);

        let half = Duration::from_millis(500);
        let mut checkpoints = vec![
            (start + steady_fires[0], "steady", 2),
            (start + steady_fires[1], "steady", 3),
            (start + flaky_delay, "flaky", 2),
        ];
        checkpoints.sort_by_key(|(at, _, _)| *at);

        for (at, tap, fetches) in checkpoints {
            sleep_until(at - half).await;
            assert_eq!(
                mock.calls_for(Endpoint::Tap, tap),
                fetches - 1,
                "{tap} fired early"
            );
            sleep_until(at + half).await;
            assert_eq!(
                mock.calls_for(Endpoint::Tap, tap),
                fetches,
                "{tap} missed its own schedule"
            );
        }

        steady.shutdown().await;
        flaky.shutdown().await;
    }
}
