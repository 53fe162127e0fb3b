//! Deadlock detection and recovery.
//!
//! The supervisor launches both workers, then polls their completion
//! flags on a fixed tick. Reaching the stall threshold with neither
//! worker done is declared a suspected deadlock; recovery aborts both
//! worker tasks, waits for them to terminate, unconditionally frees both
//! resources, and relaunches the pair with fresh randomized startup
//! delays. The randomization is what eventually breaks the lockstep:
//! over repeated generations the delays separate the workers' hold
//! windows and one of them runs to completion.

use crate::detect::DeadlockCheck;
use crate::flags::CompletionFlags;
use crate::resource::{ResourceError, ResourcePair};
use crate::worker::{run_worker, WorkerConfig};
use gridlock_types::{Mode, SupervisorConfig, WorkerId};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════
// Run Statistics
// ═══════════════════════════════════════════════════════════════════════════

/// Outcome summary for one supervised run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Worker generations launched, including generation 0.
    pub generations: u64,
    /// Recovery cycles performed (abort, release, relaunch).
    pub recoveries: u64,
    /// Polling ticks executed across all generations.
    pub ticks: u64,
    /// Successful acquisitions of resource A over the whole run.
    pub acquisitions_a: u64,
    /// Successful acquisitions of resource B over the whole run.
    pub acquisitions_b: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Supervisor
// ═══════════════════════════════════════════════════════════════════════════

type WorkerHandle = JoinHandle<Result<(), ResourceError>>;

/// Owns the shared state and both worker lifecycles for one run.
///
/// Workers see the resources and flags only through shared handles; the
/// task registry, the RNG, and every lifecycle decision stay in here.
pub struct Supervisor {
    config: SupervisorConfig,
    mode: Mode,
    resources: Arc<ResourcePair>,
    flags: Arc<CompletionFlags>,
    handles: [Option<WorkerHandle>; 2],
    rng: ChaCha8Rng,
    stats: SupervisorStats,
}

impl Supervisor {
    /// Create a supervisor for the given mode.
    ///
    /// With no configured seed the restart-delay RNG is seeded from OS
    /// entropy; tests pin a seed for reproducible generations.
    pub fn new(config: SupervisorConfig, mode: Mode) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => {
                let mut seed = [0u8; 8];
                rand::rngs::OsRng.fill_bytes(&mut seed);
                ChaCha8Rng::seed_from_u64(u64::from_le_bytes(seed))
            }
        };
        Self {
            config,
            mode,
            resources: Arc::new(ResourcePair::new()),
            flags: Arc::new(CompletionFlags::new()),
            handles: [None, None],
            rng,
            stats: SupervisorStats::default(),
        }
    }

    /// Shared view of the resources.
    pub fn resources(&self) -> &Arc<ResourcePair> {
        &self.resources
    }

    /// Shared view of the completion flags.
    pub fn flags(&self) -> &Arc<CompletionFlags> {
        &self.flags
    }

    /// Run the full demonstration: launch, watch, recover as needed,
    /// join, tear down. Returns the run summary.
    pub async fn run(mut self) -> SupervisorStats {
        info!("starting {} scenario", self.mode);

        self.launch_generation([Duration::ZERO; 2]).await;

        info!(
            "acquisition counts: A={}, B={}",
            self.resources.a().acquisitions(),
            self.resources.b().acquisitions()
        );
        info!("will try to join workers unless they deadlock");

        self.watch().await;

        for id in WorkerId::ALL {
            self.join_worker(id).await;
        }

        self.teardown();
        info!("All done");
        self.stats
    }

    /// Launch a fresh generation of both workers.
    ///
    /// In safe mode worker 1 is joined to completion before worker 2 is
    /// created, which removes the lock-order inversion entirely.
    async fn launch_generation(&mut self, delays: [Duration; 2]) {
        self.flags.reset();
        self.stats.generations += 1;

        self.spawn_worker(WorkerId::One, delays[0]);
        if self.mode.serializes_workers() {
            self.join_worker(WorkerId::One).await;
        }
        self.spawn_worker(WorkerId::Two, delays[1]);
    }

    fn spawn_worker(&mut self, id: WorkerId, start_delay: Duration) {
        let hold_pause = self.mode.pause_enabled().then_some(self.config.hold_pause);
        let config = WorkerConfig {
            id,
            start_delay,
            hold_pause,
        };
        debug!(worker = %id, delay = ?start_delay, "spawning worker");
        let handle = tokio::spawn(run_worker(
            config,
            Arc::clone(&self.resources),
            Arc::clone(&self.flags),
        ));
        self.handles[id.index()] = Some(handle);
    }

    /// Wait for a worker's task to finish and report the outcome.
    ///
    /// Join failures are reported, never fatal.
    async fn join_worker(&mut self, id: WorkerId) {
        let Some(handle) = self.handles[id.index()].take() else {
            return;
        };
        match handle.await {
            Ok(Ok(())) => info!("{} joined", id),
            Ok(Err(err)) => warn!("{} stopped with error: {}", id, err),
            Err(err) if err.is_cancelled() => debug!("{} cancelled", id),
            Err(err) => warn!("failed to join {}: {}", id, err),
        }
    }

    /// Poll completion on a fixed tick, recovering whenever the stall
    /// threshold trips, until some worker completes.
    async fn watch(&mut self) {
        let mut check = DeadlockCheck::new(self.config.stall_threshold);
        // Do-while: at least one tick runs before the exit condition is
        // read, and polling continues only while NEITHER worker has
        // completed. The loop exits as soon as either flag is true, even
        // with the other worker still in flight; the join phase picks up
        // the remaining worker.
        loop {
            if check.is_stalled() {
                self.recover().await;
                check.reset();
            }
            debug!(stalled_ticks = check.stalled_ticks(), "checking for deadlock");
            check.tick();
            self.stats.ticks += 1;
            let _ = time::timeout(self.config.tick_interval, self.flags.progress()).await;
            if self.flags.any_complete() {
                break;
            }
        }
    }

    /// Break a suspected deadlock.
    ///
    /// Aborts both workers, waits for the tasks to actually terminate,
    /// then frees both resources and relaunches with randomized delays.
    async fn recover(&mut self) {
        warn!("Deadlock detected! recovering");
        self.stats.recoveries += 1;

        for id in WorkerId::ALL {
            if let Some(handle) = &self.handles[id.index()] {
                info!("{} cancel", id);
                handle.abort();
            }
        }
        // The aborted tasks must be fully terminated before the resources
        // are repaired, or a still-running worker could race the release.
        for id in WorkerId::ALL {
            self.join_worker(id).await;
        }

        self.resources.release_all();

        let delays = [self.restart_delay(), self.restart_delay()];
        info!("{} restart with delay {:?}", WorkerId::One, delays[0]);
        info!("{} restart with delay {:?}", WorkerId::Two, delays[1]);
        self.launch_generation(delays).await;
    }

    fn restart_delay(&mut self) -> Duration {
        let units = self.rng.gen_range(0..=self.config.max_delay_units);
        self.config.delay_unit * units as u32
    }

    /// Verify both resources ended the run free and capture the final
    /// counters.
    fn teardown(&mut self) {
        for resource in [self.resources.a(), self.resources.b()] {
            if resource.is_held() {
                error!("resource {} still held at teardown", resource.id());
            }
        }
        self.stats.acquisitions_a = self.resources.a().acquisitions();
        self.stats.acquisitions_b = self.resources.b().acquisitions();
        info!(
            "final acquisition counts: A={}, B={}",
            self.stats.acquisitions_a, self.stats.acquisitions_b
        );
    }
}
