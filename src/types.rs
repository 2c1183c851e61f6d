//! Core types shared by the partition, selection and engine modules.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The direction in which an objective of the dominance relation is better.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    /// Smaller values are better.
    Minimize,
    /// Larger values are better.
    Maximize,
}

/// Why a search stopped.
///
/// Every terminal path of an engine sets exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationReason {
    /// A sampled value was negative: the robustness claim is falsified.
    Falsified,
    /// The evaluation or round budget ran out, or every leaf became invalid.
    BudgetExhausted,
    /// The minimum stopped improving and no region can beat it any more.
    Converged,
    /// Every valid leaf reached the maximum division depth.
    MaxDepth,
}

impl TerminationReason {
    /// Returns `true` for [`TerminationReason::Falsified`].
    #[must_use]
    pub fn is_falsified(self) -> bool {
        matches!(self, Self::Falsified)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Falsified => "falsified",
            Self::BudgetExhausted => "budget exhausted",
            Self::Converged => "converged",
            Self::MaxDepth => "max depth",
        };
        f.write_str(name)
    }
}

/// Lifecycle of one `solve` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EngineState {
    /// Rounds are being executed.
    Running,
    /// A terminal reason has been recorded.
    Terminated(TerminationReason),
}
