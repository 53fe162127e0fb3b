//! Scenario mode selection.

use std::fmt;

/// Contention policy for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Both workers start immediately with the inter-acquisition pause
    /// enabled. Deadlock-prone: the pauses overlap while each worker holds
    /// its first resource.
    Unsafe,

    /// Worker 1 is run to completion before worker 2 is created.
    /// Deadlock-free by construction.
    Safe,

    /// Both workers start immediately with the pause disabled, leaving a
    /// tight race that may or may not deadlock depending on scheduling.
    Race,
}

impl Mode {
    /// Select a mode from a single command-line argument.
    ///
    /// Matches the first four characters case-sensitively, so `safety`
    /// selects [`Mode::Safe`] while `Safe` does not. Anything unrecognized
    /// falls back to [`Mode::Unsafe`].
    pub fn from_arg(arg: &str) -> Mode {
        let bytes = arg.as_bytes();
        if bytes.starts_with(b"safe") {
            Mode::Safe
        } else if bytes.starts_with(b"race") {
            Mode::Race
        } else {
            Mode::Unsafe
        }
    }

    /// Whether worker 1 must be fully joined before worker 2 is created.
    pub fn serializes_workers(self) -> bool {
        matches!(self, Mode::Safe)
    }

    /// Whether workers pause between their first and second acquisition.
    pub fn pause_enabled(self) -> bool {
        !matches!(self, Mode::Race)
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Unsafe
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Unsafe => write!(f, "unsafe"),
            Mode::Safe => write!(f, "safe"),
            Mode::Race => write!(f, "race"),
        }
    }
}
