use std::fmt::{self, Display, Formatter};

use crate::gate::GateId;

pub type Rounds = usize;

pub const DEFAULT_MAX_ITERATIONS: Rounds = 100;

/// Extra rounds run after the iteration ceiling to find out which gates
/// keep oscillating.
pub const DIAGNOSTIC_ROUNDS: Rounds = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Ceiling on settle rounds per update.
    pub max_iterations: Rounds,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl SimConfig {
    pub fn with_max_iterations(max_iterations: Rounds) -> Self {
        Self { max_iterations }
    }

    /// Upper bound on evaluation rounds in a single update.
    pub fn round_limit(&self) -> Rounds {
        self.max_iterations + DIAGNOSTIC_ROUNDS
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunResult {
    Stabilized {
        after_iterations: Rounds,
    },
    ReachedMaxIterations {
        max_iterations: Rounds,
        unstable: Vec<GateId>,
    },
}

impl RunResult {
    pub fn is_stable(&self) -> bool {
        matches!(self, RunResult::Stabilized { .. })
    }

    /// Evaluation rounds run, diagnostic rounds included.
    pub fn rounds(&self) -> Rounds {
        match self {
            RunResult::Stabilized { after_iterations } => *after_iterations,
            RunResult::ReachedMaxIterations { max_iterations, .. } => {
                max_iterations + DIAGNOSTIC_ROUNDS
            }
        }
    }

    pub fn unstable(&self) -> &[GateId] {
        match self {
            RunResult::Stabilized { .. } => &[],
            RunResult::ReachedMaxIterations { unstable, .. } => unstable,
        }
    }
}

impl Display for RunResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            RunResult::Stabilized { after_iterations } => {
                write!(f, "stabilized after {after_iterations} iterations")
            }
            RunResult::ReachedMaxIterations {
                max_iterations,
                unstable,
            } => write!(
                f,
                "did not stabilize within {max_iterations} iterations ({} unstable gates)",
                unstable.len()
            ),
        }
    }
}
