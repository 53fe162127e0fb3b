//! Stall detection for the polling loop.

/// Counts consecutive polling ticks that observed no worker completion.
///
/// The supervisor records one [`tick`](DeadlockCheck::tick) per polling
/// interval and treats reaching the threshold as a suspected deadlock.
/// The count restarts whenever a new worker generation is launched.
#[derive(Debug, Clone)]
pub struct DeadlockCheck {
    stalled_ticks: u32,
    threshold: u32,
}

impl DeadlockCheck {
    /// Create a fresh check with the given threshold, in ticks.
    pub fn new(threshold: u32) -> Self {
        Self {
            stalled_ticks: 0,
            threshold,
        }
    }

    /// Record one polling interval with neither worker complete.
    pub fn tick(&mut self) {
        self.stalled_ticks = self.stalled_ticks.saturating_add(1);
    }

    /// Whether enough stalled ticks have accumulated to suspect deadlock.
    pub fn is_stalled(&self) -> bool {
        self.stalled_ticks >= self.threshold
    }

    /// Ticks observed since the last reset.
    pub fn stalled_ticks(&self) -> u32 {
        self.stalled_ticks
    }

    /// Start over for a new generation.
    pub fn reset(&mut self) {
        self.stalled_ticks = 0;
    }
}
