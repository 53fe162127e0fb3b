//! Supervisor timing configuration.

use std::time::Duration;

/// Timing and randomization knobs for the supervisor.
///
/// The defaults encode the classic demonstration timings: a 1-second
/// polling tick, a 1-second inter-acquisition pause, ten stalled ticks
/// before a deadlock is declared, and restart delays of 0 to 4 seconds.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Polling interval of the deadlock-detection loop.
    pub tick_interval: Duration,

    /// Pause between a worker's first and second acquisition (disabled in
    /// race mode). Widens the window in which both workers hold one
    /// resource each, which is what makes the unsafe scenario reliably
    /// deadlock.
    pub hold_pause: Duration,

    /// Consecutive stalled ticks before a deadlock is declared.
    pub stall_threshold: u32,

    /// One unit of randomized restart delay.
    pub delay_unit: Duration,

    /// Restart delays are drawn uniformly from `0..=max_delay_units`
    /// units.
    pub max_delay_units: u64,

    /// Seed for the restart-delay RNG. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            hold_pause: Duration::from_secs(1),
            stall_threshold: 10,
            delay_unit: Duration::from_secs(1),
            max_delay_units: 4,
            seed: None,
        }
    }
}

impl SupervisorConfig {
    /// Create a configuration with the default demonstration timings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the polling interval.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the inter-acquisition pause.
    pub fn with_hold_pause(mut self, pause: Duration) -> Self {
        self.hold_pause = pause;
        self
    }

    /// Set the stall threshold, in ticks.
    pub fn with_stall_threshold(mut self, ticks: u32) -> Self {
        self.stall_threshold = ticks;
        self
    }

    /// Set the restart-delay unit.
    pub fn with_delay_unit(mut self, unit: Duration) -> Self {
        self.delay_unit = unit;
        self
    }

    /// Set the maximum restart delay, in units.
    pub fn with_max_delay_units(mut self, units: u64) -> Self {
        self.max_delay_units = units;
        self
    }

    /// Set the RNG seed for deterministic restart delays.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}
