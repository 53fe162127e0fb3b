//! The contending worker task.
//!
//! A worker's whole life is linear: wait out its startup delay, acquire
//! its first resource, optionally pause, acquire its second, then release
//! both and report completion. The two workers acquire in opposite
//! orders, so two overlapping pauses produce the classic lock-order
//! inversion deadlock. A worker has no retry logic and no cleanup path:
//! when the supervisor aborts it mid-acquire it simply stops, leaving its
//! completion flag unset and any held resource for the supervisor to
//! repair.

use crate::flags::CompletionFlags;
use crate::resource::{ResourceError, ResourcePair};
use gridlock_types::WorkerId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

/// Per-generation launch parameters for one worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Which worker this is; fixes the acquisition order.
    pub id: WorkerId,
    /// Delay before the first acquisition attempt. Zero for generation 0,
    /// randomized on relaunch to break the lockstep that deadlocked.
    pub start_delay: Duration,
    /// Pause between the two acquisitions, `None` in race mode.
    pub hold_pause: Option<Duration>,
}

/// Run one worker to completion.
///
/// The acquires are the only suspension points apart from the configured
/// sleeps, so an abort can only land with the worker holding zero or one
/// resource, never mid-release.
pub async fn run_worker(
    config: WorkerConfig,
    resources: Arc<ResourcePair>,
    flags: Arc<CompletionFlags>,
) -> Result<(), ResourceError> {
    let WorkerConfig {
        id,
        start_delay,
        hold_pause,
    } = config;

    sleep(start_delay).await;

    let (first, second) = resources.ordered_for(id);

    info!("{} grabbing resources", id);
    first.acquire().await?;
    if let Some(pause) = hold_pause {
        sleep(pause).await;
    }
    info!("{} got {}, trying for {}", id, first.id(), second.id());
    second.acquire().await?;
    info!("{} got {} and {}", id, first.id(), second.id());

    second.release();
    first.release();

    info!("{} done", id);
    flags.mark_complete(id);
    Ok(())
}
