//! Deadlock demonstration and recovery runtime.
//!
//! Two workers contend for two exclusive resources while a supervisor
//! watches their completion flags and repairs the inevitable deadlock.
//!
//! # Problem
//!
//! The workers acquire the resources in opposite order, each pausing
//! while holding its first:
//!
//! ```text
//! worker 1: acquire A ── pause ──► acquire B (held by worker 2)
//! worker 2: acquire B ── pause ──► acquire A (held by worker 1)
//!
//! Result: each holds what the other needs → deadlock
//! ```
//!
//! # Solution
//!
//! The supervisor never sees a wait-for graph; it watches for the absence
//! of progress. A fixed polling tick counts intervals with neither
//! completion flag set, and reaching the stall threshold is treated as a
//! suspected deadlock. Recovery then aborts both worker tasks, releases
//! both resources unconditionally (an aborted worker leaves its held
//! resource behind), and relaunches the pair with randomized startup
//! delays. Enough restarts eventually draw delays that separate the two
//! hold windows, so the run completes with probability 1 even though no
//! single generation is guaranteed to.
//!
//! # Components
//!
//! - [`Resource`] / [`ResourcePair`] - Exclusive locks with detached
//!   ownership and acquisition counters
//! - [`CompletionFlags`] - Per-worker done bits plus the polling wakeup
//! - [`DeadlockCheck`] - Stall counter against the tick threshold
//! - [`run_worker`] / [`WorkerConfig`] - The contending worker task
//! - [`Supervisor`] / [`SupervisorStats`] - Lifecycle owner: launch,
//!   watch, recover, join, tear down

mod detect;
mod flags;
mod resource;
mod supervisor;
mod worker;

pub use detect::DeadlockCheck;
pub use flags::CompletionFlags;
pub use resource::{Resource, ResourceError, ResourcePair};
pub use supervisor::{Supervisor, SupervisorStats};
pub use worker::{run_worker, WorkerConfig};
