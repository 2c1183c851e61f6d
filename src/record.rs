//! The outcome of one search.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::partition::RegionId;
use crate::types::TerminationReason;

/// Progress snapshot taken at the end of each round.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoundSummary {
    /// One-based round number.
    pub round: usize,
    /// Best value after the round.
    pub minimum: f64,
    /// Oracle calls made so far, root included.
    pub evaluations: usize,
    /// Number of leaves after the round.
    pub leaves: usize,
    /// Number of regions chosen for subdivision.
    pub selected: usize,
    /// Total volume of the leaves. Always 1 up to rounding.
    pub leaf_volume: f64,
}

/// Result of [`LowBoundedDirect::solve`](crate::LowBoundedDirect::solve) or
/// [`PosetDirect::solve`](crate::PosetDirect::solve).
///
/// Points are reported in unit-cube coordinates; map them back with
/// [`Bounds::to_real`](crate::Bounds::to_real).
///
/// # Examples
///
/// ```
/// use lbdirect::prelude::*;
///
/// let bounds = Bounds::new([(-1.0, 1.0), (-1.0, 1.0)]).unwrap();
/// let config = DirectConfig::builder().max_evaluations(200).build().unwrap();
/// let engine = LowBoundedDirect::new(
///     |x: &[f64]| (x[0] - 0.3).abs() + (x[1] - 0.7).abs() + 0.05,
///     bounds.clone(),
///     config,
/// );
/// let record = engine.solve();
///
/// assert!(!record.is_falsified());
/// assert!(record.evaluations() <= 200);
/// let real = bounds.to_real(record.optimal_result()).unwrap();
/// assert_eq!(real.len(), 2);
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchRecord {
    pub(crate) minimum: f64,
    pub(crate) best_region: RegionId,
    pub(crate) best_point: Vec<f64>,
    pub(crate) best_depth: u32,
    pub(crate) best_size: f64,
    pub(crate) evaluations: usize,
    pub(crate) rounds: usize,
    pub(crate) termination: TerminationReason,
    pub(crate) all_invalid: bool,
    pub(crate) history: Vec<RoundSummary>,
    pub(crate) largest_slope: f64,
    pub(crate) local_lower_bound: f64,
    pub(crate) largest_selection: usize,
}

impl SearchRecord {
    /// A record holding only the root region.
    pub(crate) fn new(root_center: Vec<f64>, root_value: Option<f64>, root_size: f64) -> Self {
        let minimum = root_value.unwrap_or(f64::INFINITY);
        Self {
            minimum,
            best_region: RegionId::ROOT,
            best_point: root_center,
            best_depth: 0,
            best_size: root_size,
            evaluations: 1,
            rounds: 0,
            termination: TerminationReason::BudgetExhausted,
            all_invalid: root_value.is_none(),
            history: Vec::new(),
            largest_slope: 0.0,
            local_lower_bound: minimum,
            largest_selection: 0,
        }
    }

    /// The best sampled point, in unit-cube coordinates.
    #[must_use]
    pub fn optimal_result(&self) -> &[f64] {
        &self.best_point
    }

    /// The best sampled value; `+inf` if every evaluation failed.
    #[must_use]
    pub fn minimum(&self) -> f64 {
        self.minimum
    }

    /// Number of oracle calls, root included.
    #[must_use]
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Number of completed rounds.
    #[must_use]
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Why the search stopped.
    #[must_use]
    pub fn termination(&self) -> TerminationReason {
        self.termination
    }

    /// Returns `true` if a negative value was found.
    #[must_use]
    pub fn is_falsified(&self) -> bool {
        self.termination.is_falsified()
    }

    /// Division depth of the region holding the best point.
    #[must_use]
    pub fn best_depth(&self) -> u32 {
        self.best_depth
    }

    /// Id of the leaf holding the best point.
    #[must_use]
    pub fn best_region(&self) -> RegionId {
        self.best_region
    }

    /// Size (half diagonal) of the leaf holding the best point.
    #[must_use]
    pub fn best_size(&self) -> f64 {
        self.best_size
    }

    /// Returns `true` if the search ended because every leaf was invalid.
    #[must_use]
    pub fn all_invalid(&self) -> bool {
        self.all_invalid
    }

    /// One summary per completed round, in order.
    #[must_use]
    pub fn history(&self) -> &[RoundSummary] {
        &self.history
    }

    /// Steepest lower-hull edge observed over all rounds.
    #[must_use]
    pub fn largest_slope(&self) -> f64 {
        self.largest_slope
    }

    /// Smallest optimistic bound `value - K * size` over the selectable
    /// leaves of the last round, with `K` the assumed Lipschitz constant or
    /// else [`largest_slope`](Self::largest_slope).
    ///
    /// Not a certified bound: it is only as good as `K`.
    #[must_use]
    pub fn local_lower_bound(&self) -> f64 {
        self.local_lower_bound
    }

    /// Largest number of regions subdivided in one round.
    #[must_use]
    pub fn largest_selection(&self) -> usize {
        self.largest_selection
    }
}

impl fmt::Display for SearchRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} rounds and {} evaluations: minimum {:.6} at {:?} (region {}, depth {})",
            self.termination,
            self.rounds,
            self.evaluations,
            self.minimum,
            self.best_point,
            self.best_region,
            self.best_depth,
        )
    }
}
