//! Exclusive resources with detached ownership.
//!
//! Each [`Resource`] is an exclusive lock around one logical resource. The
//! lock is a one-permit semaphore whose permit is *forgotten* on acquire:
//! holding is recorded in the resource itself rather than in a guard owned
//! by the acquiring task. A worker aborted mid-critical-section therefore
//! leaves its resource held. That is the inconsistent state the supervisor
//! must repair with an unconditional [`Resource::release`] before it can
//! relaunch anything.

use gridlock_types::{ResourceId, WorkerId};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::trace;

/// Error acquiring a resource.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ResourceError {
    /// The underlying lock was closed. Never happens in a normal run;
    /// surfaced so worker tasks can bail out cleanly instead of panicking.
    #[error("resource {0} is closed")]
    Closed(ResourceId),
}

/// An exclusive-access guard around one logical resource.
///
/// At most one task holds the resource at a time; the acquisition counter
/// only ever increases.
pub struct Resource {
    id: ResourceId,
    lock: Semaphore,
    held: AtomicBool,
    acquisitions: AtomicU64,
}

impl Resource {
    /// Create a free resource.
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            lock: Semaphore::new(1),
            held: AtomicBool::new(false),
            acquisitions: AtomicU64::new(0),
        }
    }

    /// Identity of this resource.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Suspend until exclusive ownership is obtained, then record the
    /// acquisition.
    ///
    /// Ownership is not tied to a guard: the holder (or, after a forced
    /// abort, the supervisor) must call [`release`](Self::release).
    /// Cancelling a task suspended here neither takes nor leaks the lock.
    pub async fn acquire(&self) -> Result<(), ResourceError> {
        let permit = self
            .lock
            .acquire()
            .await
            .map_err(|_| ResourceError::Closed(self.id))?;
        // Detach ownership from the guard; only release() returns the
        // permit. No await point between here and the bookkeeping below,
        // so an abort cannot split the two.
        permit.forget();
        let was_held = self.held.swap(true, Ordering::AcqRel);
        debug_assert!(!was_held, "resource {} double-acquired", self.id);
        self.acquisitions.fetch_add(1, Ordering::Relaxed);
        trace!(resource = %self.id, "acquired");
        Ok(())
    }

    /// Release the resource no matter who holds it.
    ///
    /// Callable when the resource is not held (recovery runs it
    /// unconditionally after aborting the workers): a free resource stays
    /// free, and repeated calls never make the lock available to more
    /// than one holder.
    pub fn release(&self) {
        if self.held.swap(false, Ordering::AcqRel) {
            self.lock.add_permits(1);
            trace!(resource = %self.id, "released");
        }
    }

    /// Whether some task currently holds the resource.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Number of successful acquisitions so far (monotonic).
    pub fn acquisitions(&self) -> u64 {
        self.acquisitions.load(Ordering::Relaxed)
    }
}

/// The two shared resources, fixed for the life of a run.
pub struct ResourcePair {
    a: Resource,
    b: Resource,
}

impl ResourcePair {
    /// Create both resources, free.
    pub fn new() -> Self {
        Self {
            a: Resource::new(ResourceId::A),
            b: Resource::new(ResourceId::B),
        }
    }

    /// Resource A.
    pub fn a(&self) -> &Resource {
        &self.a
    }

    /// Resource B.
    pub fn b(&self) -> &Resource {
        &self.b
    }

    /// Resource lookup by identity.
    pub fn get(&self, id: ResourceId) -> &Resource {
        match id {
            ResourceId::A => &self.a,
            ResourceId::B => &self.b,
        }
    }

    /// The resources in the order the given worker acquires them.
    pub fn ordered_for(&self, worker: WorkerId) -> (&Resource, &Resource) {
        let (first, second) = worker.acquisition_order();
        (self.get(first), self.get(second))
    }

    /// Unconditionally free both resources, B first then A.
    ///
    /// Recovery path: repairs whatever held state aborted workers left
    /// behind. Idempotent for the same reason [`Resource::release`] is.
    pub fn release_all(&self) {
        self.b.release();
        self.a.release();
    }

    /// True if either resource is currently held.
    pub fn any_held(&self) -> bool {
        self.a.is_held() || self.b.is_held()
    }
}

impl Default for ResourcePair {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_acquire_increments_counter() {
        let resource = Resource::new(ResourceId::A);
        assert_eq!(resource.acquisitions(), 0);

        resource.acquire().await.unwrap();
        assert!(resource.is_held());
        assert_eq!(resource.acquisitions(), 1);

        resource.release();
        resource.acquire().await.unwrap();
        assert_eq!(resource.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_acquire_blocks_while_held() {
        let resource = Arc::new(Resource::new(ResourceId::A));
        resource.acquire().await.unwrap();

        let mut contender = {
            let resource = Arc::clone(&resource);
            tokio::spawn(async move { resource.acquire().await })
        };

        // The contender cannot get the lock while we hold it.
        let blocked = tokio::time::timeout(Duration::from_millis(50), &mut contender).await;
        assert!(blocked.is_err(), "second acquire completed while held");

        // Releasing hands the lock to the queued contender.
        resource.release();
        tokio::time::timeout(Duration::from_millis(100), contender)
            .await
            .expect("contender did not finish after release")
            .expect("contender panicked")
            .unwrap();
        assert_eq!(resource.acquisitions(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_mutual_exclusion_under_contention() {
        let resource = Arc::new(Resource::new(ResourceId::A));
        let in_section = Arc::new(AtomicU64::new(0));
        let overlaps = Arc::new(AtomicU64::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let resource = Arc::clone(&resource);
                let in_section = Arc::clone(&in_section);
                let overlaps = Arc::clone(&overlaps);
                tokio::spawn(async move {
                    for _ in 0..50 {
                        resource.acquire().await.unwrap();
                        if in_section.fetch_add(1, Ordering::AcqRel) != 0 {
                            overlaps.fetch_add(1, Ordering::AcqRel);
                        }
                        // Stay in the critical section across a suspension
                        // point so other threads get a chance to intrude.
                        tokio::task::yield_now().await;
                        in_section.fetch_sub(1, Ordering::AcqRel);
                        resource.release();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(overlaps.load(Ordering::Acquire), 0, "exclusion violated");
        assert_eq!(resource.acquisitions(), 8 * 50);
        assert!(!resource.is_held());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let resource = Resource::new(ResourceId::B);
        resource.acquire().await.unwrap();

        resource.release();
        resource.release();
        resource.release();

        // Exactly one holder fits, no matter how many releases ran.
        resource.acquire().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(50), resource.acquire()).await;
        assert!(second.is_err(), "idempotent release leaked an extra permit");
    }

    #[tokio::test]
    async fn test_release_without_holder_is_noop() {
        let resource = Resource::new(ResourceId::A);

        resource.release();
        assert!(!resource.is_held());
        assert_eq!(resource.acquisitions(), 0);

        resource.acquire().await.unwrap();
        let second = tokio::time::timeout(Duration::from_millis(50), resource.acquire()).await;
        assert!(second.is_err(), "release of a free resource added a permit");
    }

    #[tokio::test]
    async fn test_aborted_holder_leaves_resource_held() {
        let resource = Arc::new(Resource::new(ResourceId::A));
        let (acquired_tx, acquired_rx) = oneshot::channel();

        let holder = {
            let resource = Arc::clone(&resource);
            tokio::spawn(async move {
                resource.acquire().await.unwrap();
                acquired_tx.send(()).unwrap();
                std::future::pending::<()>().await;
            })
        };
        acquired_rx.await.unwrap();

        holder.abort();
        let join = holder.await;
        assert!(join.unwrap_err().is_cancelled());

        // The hazard: the task is gone but the resource is still held.
        assert!(resource.is_held());

        // Recovery repairs it; a fresh acquire then succeeds.
        resource.release();
        tokio::time::timeout(Duration::from_millis(100), resource.acquire())
            .await
            .expect("acquire after recovery timed out")
            .unwrap();
        assert_eq!(resource.acquisitions(), 2);
    }

    #[tokio::test]
    async fn test_aborting_blocked_acquire_takes_nothing() {
        let resource = Arc::new(Resource::new(ResourceId::B));
        resource.acquire().await.unwrap();

        let contender = {
            let resource = Arc::clone(&resource);
            tokio::spawn(async move { resource.acquire().await })
        };
        // Let the contender reach the blocked acquire before aborting it.
        tokio::time::sleep(Duration::from_millis(20)).await;
        contender.abort();
        let join = contender.await;
        assert!(join.unwrap_err().is_cancelled());

        // The aborted contender neither acquired nor corrupted the lock.
        assert_eq!(resource.acquisitions(), 1);
        resource.release();
        tokio::time::timeout(Duration::from_millis(100), resource.acquire())
            .await
            .expect("acquire after aborted contender timed out")
            .unwrap();
    }

    #[tokio::test]
    async fn test_pair_acquisition_orders() {
        let pair = ResourcePair::new();

        let (first, second) = pair.ordered_for(WorkerId::One);
        assert_eq!(first.id(), ResourceId::A);
        assert_eq!(second.id(), ResourceId::B);

        let (first, second) = pair.ordered_for(WorkerId::Two);
        assert_eq!(first.id(), ResourceId::B);
        assert_eq!(second.id(), ResourceId::A);
    }

    #[tokio::test]
    async fn test_release_all_frees_held_pair() {
        let pair = ResourcePair::new();
        pair.a().acquire().await.unwrap();
        pair.b().acquire().await.unwrap();
        assert!(pair.any_held());

        pair.release_all();
        assert!(!pair.any_held());

        pair.a().acquire().await.unwrap();
        pair.b().acquire().await.unwrap();
        assert_eq!(pair.a().acquisitions(), 2);
        assert_eq!(pair.b().acquisitions(), 2);
    }
}
