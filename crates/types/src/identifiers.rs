//! Identifiers for the two workers and the two resources.

use std::fmt;

/// Resource identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    A,
    B,
}

impl ResourceId {
    /// Short name used in transcript lines.
    pub fn name(self) -> &'static str {
        match self {
            ResourceId::A => "A",
            ResourceId::B => "B",
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Worker identity.
///
/// Identity fixes the acquisition order: worker 1 takes A then B, worker 2
/// takes B then A. That opposite ordering is the lock-order inversion the
/// whole demonstration is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkerId {
    One,
    Two,
}

impl WorkerId {
    /// Both workers, in launch order.
    pub const ALL: [WorkerId; 2] = [WorkerId::One, WorkerId::Two];

    /// Display number (1 or 2).
    pub fn number(self) -> u8 {
        match self {
            WorkerId::One => 1,
            WorkerId::Two => 2,
        }
    }

    /// Stable slot index for per-worker registries.
    pub fn index(self) -> usize {
        match self {
            WorkerId::One => 0,
            WorkerId::Two => 1,
        }
    }

    /// The other worker.
    pub fn other(self) -> WorkerId {
        match self {
            WorkerId::One => WorkerId::Two,
            WorkerId::Two => WorkerId::One,
        }
    }

    /// The resources this worker acquires, in order (first, second).
    pub fn acquisition_order(self) -> (ResourceId, ResourceId) {
        match self {
            WorkerId::One => (ResourceId::A, ResourceId::B),
            WorkerId::Two => (ResourceId::B, ResourceId::A),
        }
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}", self.number())
    }
}
