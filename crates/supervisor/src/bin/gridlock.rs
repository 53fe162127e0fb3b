//! Two-worker deadlock demonstration.
//!
//! Spawns two workers that acquire two shared resources in opposite
//! order, watches for the resulting deadlock, and recovers by aborting
//! both workers and relaunching them with randomized startup delays.
//!
//! # Usage
//!
//! ```bash
//! # Deadlock-prone default scenario
//! gridlock
//!
//! # Worker 1 fully completes before worker 2 starts
//! gridlock safe
//!
//! # No inter-acquisition pause; tight race
//! gridlock race
//!
//! # Deterministic restart delays and fast timings
//! gridlock --seed 42 --tick 50ms --pause 50ms --delay-unit 50ms
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gridlock_supervisor::Supervisor;
use gridlock_types::{Mode, SupervisorConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "gridlock",
    about = "Two-worker deadlock demonstration and recovery"
)]
struct Cli {
    /// Scenario mode: safe, race, or unsafe (default). Only the first
    /// four characters are matched, case-sensitively; anything else runs
    /// the unsafe scenario.
    #[arg(value_name = "MODE", num_args = 0..)]
    mode: Vec<String>,

    /// Polling interval of the deadlock watcher.
    #[arg(long, default_value = "1s")]
    tick: humantime::Duration,

    /// Pause between a worker's two acquisitions (ignored in race mode).
    #[arg(long, default_value = "1s")]
    pause: humantime::Duration,

    /// Stalled ticks before a deadlock is declared.
    #[arg(long, default_value_t = 10)]
    threshold: u32,

    /// One unit of randomized restart delay.
    #[arg(long, default_value = "1s")]
    delay_unit: humantime::Duration,

    /// Restart delays are drawn from 0..=N delay units.
    #[arg(long, value_name = "N", default_value_t = 4)]
    max_delay: u64,

    /// Seed for restart-delay randomization (default: OS entropy).
    #[arg(long)]
    seed: Option<u64>,

    /// Log level when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Apply the reference argument rules: zero arguments or an unrecognized
/// one mean unsafe, and extra arguments only earn a usage line.
fn select_mode(args: &[String]) -> Mode {
    match args {
        [] => Mode::Unsafe,
        [arg] => Mode::from_arg(arg),
        _ => {
            warn!("usage: gridlock [safe|race|unsafe]");
            Mode::Unsafe
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    let mode = select_mode(&cli.mode);
    info!("will set up {} deadlock scenario", mode);

    let mut config = SupervisorConfig::default()
        .with_tick_interval(cli.tick.into())
        .with_hold_pause(cli.pause.into())
        .with_stall_threshold(cli.threshold)
        .with_delay_unit(cli.delay_unit.into())
        .with_max_delay_units(cli.max_delay);
    if let Some(seed) = cli.seed {
        config = config.with_seed(seed);
    }

    // Without a runtime there are no worker tasks at all, so failing to
    // build one is the single unrecoverable error in the program.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create worker runtime")?;

    let stats = runtime.block_on(Supervisor::new(config, mode).run());

    info!(
        generations = stats.generations,
        recoveries = stats.recoveries,
        ticks = stats.ticks,
        "run complete"
    );
    Ok(())
}
