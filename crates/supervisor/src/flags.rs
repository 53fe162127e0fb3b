//! Per-worker completion flags shared with the supervisor.

use gridlock_types::WorkerId;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Completion state for both workers, plus the wakeup the polling loop
/// waits on.
///
/// Each worker sets only its own flag, exactly once per generation; the
/// supervisor reads both and clears them when it relaunches a generation.
/// The notify lets the polling loop wake as soon as a worker finishes
/// instead of sleeping out the rest of its tick.
#[derive(Debug)]
pub struct CompletionFlags {
    worker_one: AtomicBool,
    worker_two: AtomicBool,
    wakeup: Notify,
}

impl CompletionFlags {
    /// Create both flags, unset.
    pub fn new() -> Self {
        Self {
            worker_one: AtomicBool::new(false),
            worker_two: AtomicBool::new(false),
            wakeup: Notify::new(),
        }
    }

    /// Record completion for `worker` and wake the polling loop.
    pub fn mark_complete(&self, worker: WorkerId) {
        self.flag(worker).store(true, Ordering::Release);
        self.wakeup.notify_one();
    }

    /// Whether the given worker has completed this generation.
    pub fn is_complete(&self, worker: WorkerId) -> bool {
        self.flag(worker).load(Ordering::Acquire)
    }

    /// Whether either worker has completed this generation.
    pub fn any_complete(&self) -> bool {
        self.is_complete(WorkerId::One) || self.is_complete(WorkerId::Two)
    }

    /// Whether both workers have completed this generation.
    pub fn both_complete(&self) -> bool {
        self.is_complete(WorkerId::One) && self.is_complete(WorkerId::Two)
    }

    /// Clear both flags for a fresh generation.
    pub fn reset(&self) {
        self.worker_one.store(false, Ordering::Release);
        self.worker_two.store(false, Ordering::Release);
    }

    /// Resolves when a worker reports progress.
    ///
    /// Used with a bounded timeout as the polling tick. A completion
    /// recorded while nobody was waiting is buffered, so the wait after a
    /// missed notification returns immediately rather than stalling.
    pub async fn progress(&self) {
        self.wakeup.notified().await;
    }

    fn flag(&self, worker: WorkerId) -> &AtomicBool {
        match worker {
            WorkerId::One => &self.worker_one,
            WorkerId::Two => &self.worker_two,
        }
    }
}

impl Default for CompletionFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_flags_start_unset() {
        let flags = CompletionFlags::new();
        assert!(!flags.is_complete(WorkerId::One));
        assert!(!flags.is_complete(WorkerId::Two));
        assert!(!flags.any_complete());
        assert!(!flags.both_complete());
    }

    #[test]
    fn test_mark_complete_sets_only_own_flag() {
        let flags = CompletionFlags::new();
        flags.mark_complete(WorkerId::One);

        assert!(flags.is_complete(WorkerId::One));
        assert!(!flags.is_complete(WorkerId::Two));
        assert!(flags.any_complete());
        assert!(!flags.both_complete());

        flags.mark_complete(WorkerId::Two);
        assert!(flags.both_complete());
    }

    #[test]
    fn test_reset_clears_both() {
        let flags = CompletionFlags::new();
        flags.mark_complete(WorkerId::One);
        flags.mark_complete(WorkerId::Two);

        flags.reset();
        assert!(!flags.any_complete());
    }

    #[tokio::test]
    async fn test_progress_wakes_bounded_wait() {
        let flags = Arc::new(CompletionFlags::new());

        let marker = {
            let flags = Arc::clone(&flags);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                flags.mark_complete(WorkerId::Two);
            })
        };

        tokio::time::timeout(Duration::from_secs(1), flags.progress())
            .await
            .expect("completion did not wake the waiter");
        assert!(flags.any_complete());
        marker.await.unwrap();
    }

    #[tokio::test]
    async fn test_bounded_wait_elapses_without_progress() {
        let flags = CompletionFlags::new();
        let waited = tokio::time::timeout(Duration::from_millis(20), flags.progress()).await;
        assert!(waited.is_err(), "waiter woke with no progress recorded");
    }

    #[tokio::test]
    async fn test_completion_before_wait_is_not_lost() {
        let flags = CompletionFlags::new();
        flags.mark_complete(WorkerId::One);

        // The buffered notification makes the next wait return at once.
        tokio::time::timeout(Duration::from_millis(20), flags.progress())
            .await
            .expect("buffered completion was dropped");
    }
}
