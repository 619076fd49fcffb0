//! Prometheus metrics for OnTap.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_gauge, CounterVec, Encoder, Histogram,
    IntGauge, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Bootstrap chain runs by outcome (ok/settings_failed/location_failed/...).
pub static BOOTSTRAP_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ontap_bootstrap_total",
        "Dashboard bootstrap runs by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Completed poll cycles by outcome (ok/failed).
pub static POLL_CYCLES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ontap_poll_cycles_total",
        "Tap poll cycles by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Silent per-cycle fetch failures by resource.
pub static FETCH_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ontap_fetch_failures_total",
        "Failed backend fetches inside poll cycles",
        &["resource", "classification"]
    )
    .unwrap()
});

/// Number of running tap pollers.
pub static ACTIVE_POLLERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("ontap_active_pollers", "Number of running tap pollers").unwrap()
});

/// Jittered delay chosen between poll cycles.
pub static POLL_DELAY_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "ontap_poll_delay_ms",
        "Jittered delay between tap poll cycles in milliseconds",
        vec![
            1_000.0, 5_000.0, 15_000.0, 30_000.0, 60_000.0, 120_000.0, 300_000.0, 600_000.0
        ]
    )
    .unwrap()
});

/// Holds a gauge one higher for as long as it lives.
///
/// The decrement runs on drop, so a task that is aborted or dropped with its
/// runtime still gives its slot back.
#[must_use = "the gauge is decremented as soon as the guard is dropped"]
#[derive(Debug)]
pub struct GaugeGuard {
    gauge: IntGauge,
}

impl GaugeGuard {
    pub fn new(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self {
            gauge: gauge.clone(),
        }
    }
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a finished bootstrap run.
    pub fn bootstrap(outcome: &str) {
        BOOTSTRAP_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a finished poll cycle.
    pub fn poll_cycle(ok: bool) {
        let outcome = if ok { "ok" } else { "failed" };
        POLL_CYCLES_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Record a silent fetch failure inside a poll cycle.
    pub fn fetch_failed(resource: &str, classification: &str) {
        FETCH_FAILURES_TOTAL
            .with_label_values(&[resource, classification])
            .inc();
    }

    /// Count a running poller until the returned guard is dropped.
    pub fn poller_active() -> GaugeGuard {
        GaugeGuard::new(&ACTIVE_POLLERS)
    }

    /// Record the delay chosen before the next cycle.
    pub fn poll_delay(delay_ms: u64) {
        POLL_DELAY_MS.observe(delay_ms as f64);
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
