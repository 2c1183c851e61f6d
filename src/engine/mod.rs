//! Search engines and the round state machine they share.
//!
//! Both engines run the same loop on a [`Run`]:
//!
//! 1. [`Run::begin_round`] checks the budgets and collects the selectable
//!    leaves, or terminates.
//! 2. The engine picks regions (hull or frontier), plans their
//!    subdivision and evaluates the samples.
//! 3. [`Run::merge`] subdivides each region whose samples came back and
//!    tracks the incumbent; a negative value terminates the search.
//! 4. [`Run::end_round`] appends the round summary and tests convergence.
//!
//! Termination reasons are checked in a fixed priority: falsification first,
//! then the evaluation budget, the round budget, exhaustion of selectable
//! leaves and finally convergence.

mod pool;
mod poset;
mod sequential;

#[cfg(feature = "async")]
mod async_impl;

pub use poset::PosetDirect;
pub use sequential::LowBoundedDirect;

use crate::config::DirectConfig;
use crate::hull::{self, Candidate, Selection};
use crate::partition::{DivisionPlan, Partition, RegionId};
use crate::record::{RoundSummary, SearchRecord};
use crate::types::{EngineState, TerminationReason};

/// Mutable state of one `solve` call.
pub(crate) struct Run<'a> {
    config: &'a DirectConfig,
    partition: Partition,
    record: SearchRecord,
    state: EngineState,
    round_start_minimum: f64,
    divided: usize,
    stalled: bool,
}

impl<'a> Run<'a> {
    /// Builds the root region from its value and starts running.
    ///
    /// A negative root value terminates immediately with zero rounds.
    pub(crate) fn start(config: &'a DirectConfig, free: Vec<bool>, root_value: Option<f64>) -> Self {
        let partition = Partition::new(free, root_value);
        let root = partition.region(RegionId::ROOT);
        let record = SearchRecord::new(root.center.clone(), root_value, root.size);
        let mut run = Self {
            config,
            partition,
            record,
            state: EngineState::Running,
            round_start_minimum: f64::INFINITY,
            divided: 0,
            stalled: false,
        };

        trace_info!(
            dim = run.record.best_point.len(),
            root = run.record.minimum,
            "root evaluated"
        );
        if root_value.is_some_and(|v| v < 0.0) {
            trace_info!(value = run.record.minimum, "root is a counterexample");
            run.finish(TerminationReason::Falsified);
        }
        run
    }

    pub(crate) fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub(crate) fn minimum(&self) -> f64 {
        self.record.minimum
    }

    pub(crate) fn largest_slope(&self) -> f64 {
        self.record.largest_slope
    }

    pub(crate) fn config(&self) -> &'a DirectConfig {
        self.config
    }

    pub(crate) fn plan(&self, id: RegionId) -> DivisionPlan {
        self.partition.plan(id)
    }

    /// Returns `true` if `samples` more evaluations fit in the budget.
    pub(crate) fn fits(&self, samples: usize) -> bool {
        self.record.evaluations + samples <= self.config.max_evaluations
    }

    /// Adds completed oracle calls to the evaluation count.
    pub(crate) fn count(&mut self, evaluations: usize) {
        self.record.evaluations += evaluations;
    }

    /// Checks the budgets and returns the selectable leaves, or terminates.
    pub(crate) fn begin_round(&mut self) -> Option<Vec<Candidate>> {
        if !self.is_running() {
            return None;
        }
        if self.record.evaluations >= self.config.max_evaluations
            || self.record.rounds >= self.config.max_iterations
        {
            self.finish(TerminationReason::BudgetExhausted);
            return None;
        }
        let candidates = self.partition.eligible(self.config.max_deep);
        if candidates.is_empty() {
            if self.partition.all_invalid() {
                self.record.all_invalid = true;
                self.finish(TerminationReason::BudgetExhausted);
            } else {
                self.finish(TerminationReason::MaxDepth);
            }
            return None;
        }
        if self.stalled {
            self.finish(TerminationReason::Converged);
            return None;
        }
        self.round_start_minimum = self.record.minimum;
        self.divided = 0;
        Some(candidates)
    }

    /// Records the diagnostics of this round's selection.
    pub(crate) fn note_selection(&mut self, candidates: &[Candidate], selection: &Selection) {
        let record = &mut self.record;
        record.largest_slope = record.largest_slope.max(selection.largest_slope);
        record.largest_selection = record.largest_selection.max(selection.ids.len());
        let k = self.config.lipschitz.unwrap_or(record.largest_slope);
        record.local_lower_bound = hull::lower_bound(candidates, k);

        if self.config.debug {
            trace_debug!(
                round = record.rounds + 1,
                candidates = candidates.len(),
                selected = selection.ids.len(),
                fell_back = selection.fell_back,
                slope = record.largest_slope,
                lower_bound = record.local_lower_bound,
                "regions selected"
            );
        }
    }

    /// Subdivides the planned region with its sample values and updates the
    /// incumbent. Terminates on a negative value.
    pub(crate) fn merge(&mut self, plan: &DivisionPlan, values: &[Option<f64>]) {
        let children = self.partition.divide(plan, values);
        self.divided += 1;

        if self.record.best_region == plan.parent {
            if let Some(&center) = children.last() {
                self.adopt(center);
            }
        }
        for &child in &children {
            if self
                .partition
                .region(child)
                .value
                .is_some_and(|v| v < self.record.minimum)
            {
                self.adopt(child);
                trace_info!(
                    region = %child,
                    value = self.record.minimum,
                    evaluations = self.record.evaluations,
                    "new best value"
                );
            }
        }
        if self.record.minimum < 0.0 {
            trace_info!(
                value = self.record.minimum,
                point = ?self.record.best_point,
                "counterexample found"
            );
            self.finish(TerminationReason::Falsified);
        }
    }

    fn adopt(&mut self, id: RegionId) {
        let region = self.partition.region(id);
        let record = &mut self.record;
        record.best_region = id;
        record.best_point.clone_from(&region.center);
        record.minimum = region.value.unwrap_or(f64::INFINITY);
        record.best_depth = region.depth;
        record.best_size = region.size;
    }

    /// Closes the round and tests convergence.
    ///
    /// A round that divided nothing is not counted. Convergence only takes
    /// effect at the start of the next round, after the budget and depth
    /// checks.
    pub(crate) fn end_round(&mut self, selection: &Selection) {
        if self.divided == 0 {
            return;
        }
        self.record.rounds += 1;
        self.record.history.push(RoundSummary {
            round: self.record.rounds,
            minimum: self.record.minimum,
            evaluations: self.record.evaluations,
            leaves: self.partition.n_leaves(),
            selected: self.divided,
            leaf_volume: self.partition.leaf_volume(),
        });

        if self.config.debug {
            trace_debug!(
                round = self.record.rounds,
                minimum = self.record.minimum,
                evaluations = self.record.evaluations,
                leaves = self.partition.n_leaves(),
                "round merged"
            );
        }

        let improvement = self.round_start_minimum - self.record.minimum;
        let cornered = self.record.best_depth >= self.config.max_deep || selection.fell_back;
        self.stalled = improvement < self.config.tolerance && cornered;
    }

    /// Terminates with `reason`. Only the first call has an effect.
    pub(crate) fn finish(&mut self, reason: TerminationReason) {
        if let EngineState::Terminated(_) = self.state {
            return;
        }
        self.state = EngineState::Terminated(reason);
        self.record.termination = reason;
    }

    pub(crate) fn into_record(mut self) -> SearchRecord {
        if !matches!(self.state, EngineState::Terminated(_)) {
            self.finish(TerminationReason::BudgetExhausted);
        }
        trace_info!(
            termination = %self.record.termination,
            minimum = self.record.minimum,
            evaluations = self.record.evaluations,
            rounds = self.record.rounds,
            "search finished"
        );
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_root_falsifies_without_rounds() {
        let config = DirectConfig::default();
        let mut run = Run::start(&config, vec![true], Some(-0.5));
        assert!(!run.is_running());
        assert!(run.begin_round().is_none());
        let record = run.into_record();
        assert_eq!(record.termination(), TerminationReason::Falsified);
        assert_eq!(record.rounds(), 0);
        assert_eq!(record.evaluations(), 1);
    }

    #[test]
    fn invalid_root_exhausts_with_flag() {
        let config = DirectConfig::default();
        let mut run = Run::start(&config, vec![true, true], None);
        assert!(run.begin_round().is_none());
        let record = run.into_record();
        assert_eq!(record.termination(), TerminationReason::BudgetExhausted);
        assert!(record.all_invalid());
    }

    #[test]
    fn center_child_inherits_the_incumbent() {
        let config = DirectConfig::default();
        let mut run = Run::start(&config, vec![true], Some(1.0));
        let candidates = run.begin_round().unwrap();
        assert_eq!(candidates.len(), 1);
        let plan = run.plan(RegionId::ROOT);
        run.count(plan.points.len());
        run.merge(&plan, &[Some(2.0), Some(3.0)]);
        let selection = Selection {
            ids: vec![RegionId::ROOT],
            fell_back: false,
            largest_slope: 0.0,
        };
        run.end_round(&selection);

        let record = run.into_record();
        assert_eq!(record.best_region(), RegionId(3));
        assert_eq!(record.best_depth(), 1);
        assert_eq!(record.minimum(), 1.0);
        assert_eq!(record.history().len(), 1);
        assert_eq!(record.history()[0].leaves, 3);
    }

    #[test]
    fn stalled_fallback_round_converges() {
        let config = DirectConfig::default();
        let mut run = Run::start(&config, vec![true], Some(1.0));
        run.begin_round().unwrap();
        let plan = run.plan(RegionId::ROOT);
        run.merge(&plan, &[Some(2.0), Some(3.0)]);
        let selection = Selection {
            ids: vec![RegionId::ROOT],
            fell_back: true,
            largest_slope: 0.0,
        };
        run.end_round(&selection);
        assert!(run.is_running());
        assert!(run.begin_round().is_none());
        assert_eq!(run.into_record().termination(), TerminationReason::Converged);
    }
}
