//! Jittered poll scheduling.
//!
//! Every tap poller waits a randomized delay between cycles so that many
//! taps started together do not hit the backend in synchronized bursts.

use std::time::Duration;

use ontap_core::RefreshSettings;
use rand::Rng;

/// Computes randomized inter-poll delays from [`RefreshSettings`].
///
/// Holds no RNG of its own; each poller owns one so that pollers with the
/// same settings still draw different schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterScheduler {
    settings: RefreshSettings,
}

impl JitterScheduler {
    pub fn new(settings: RefreshSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> RefreshSettings {
        self.settings
    }

    /// Next delay drawn from `rng`.
    ///
    /// Whole seconds drawn uniformly from
    /// `[max(0, base - variable), base + variable]`, returned in
    /// milliseconds. The lower bound is clamped before drawing, so small
    /// `base_sec` values never produce a negative draw. A zero delay means
    /// re-poll immediately.
    pub fn delay_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = rng.gen_range(self.settings.min_sec()..=self.settings.max_sec());
        Duration::from_millis(secs.saturating_mul(1000))
    }
}
