use std::sync::Arc;

use crate::bounds::Bounds;
use crate::config::DirectConfig;
use crate::hull::{self, Candidate, Selection};
use crate::oracle::{Oracle, checked};
use crate::pareto;
use crate::partition::{DivisionPlan, Partition};
use crate::record::SearchRecord;
use crate::types::TerminationReason;

use super::Run;
use super::pool::{self, Outcome};

/// DIRECT over a truncated Pareto frontier, evaluated in batches.
///
/// Each round takes the leaves not dominated in `(larger size, smaller
/// value)`, keeps the `po_set_size` most promising of them and evaluates all
/// of their samples as one batch: a single
/// [`Oracle::evaluate_batch`] call with one worker, a scoped thread pool
/// otherwise. Results are merged in region id order. When a batch turns up a
/// negative value, only the regions up to the first falsifying one (in id
/// order) are merged and counted; those are always evaluated in full, so
/// the record does not depend on the worker count or on completion order.
///
/// Samples of later regions may still have been handed to the oracle by
/// the time the pool stops admitting them. They are discarded, so with a
/// falsifying batch [`SearchRecord::evaluations`] can be lower than the
/// number of oracle calls actually made.
///
/// # Examples
///
/// ```
/// use lbdirect::prelude::*;
///
/// let bounds = Bounds::new([(-0.1, 0.1), (-0.1, 0.1)]).unwrap();
/// let notch = |p: &[f64]| {
///     if (p[0] - 0.02).abs() <= 0.01 && (p[1] + 0.03).abs() <= 0.01 { -0.5 } else { 1.0 }
/// };
/// let config = DirectConfig::builder()
///     .max_evaluations(500)
///     .max_iterations(500)
///     .po_set_size(4)
///     .workers(4)
///     .build()
///     .unwrap();
///
/// let engine = PosetDirect::new(bounds.rescaled(notch), bounds.clone(), config);
/// let record = engine.solve();
/// assert!(record.is_falsified());
/// assert!(record.minimum() <= -0.5);
/// ```
#[derive(Debug)]
pub struct PosetDirect<O> {
    oracle: Arc<O>,
    bounds: Bounds,
    config: DirectConfig,
}

impl<O> PosetDirect<O>
where
    O: Oracle + Sync,
{
    /// Creates an engine over the unit cube of `bounds`.
    #[must_use]
    pub fn new(oracle: O, bounds: Bounds, config: DirectConfig) -> Self {
        Self {
            oracle: Arc::new(oracle),
            bounds,
            config,
        }
    }

    /// The bounds the engine was built with.
    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &DirectConfig {
        &self.config
    }

    /// The wrapped oracle.
    #[must_use]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub(crate) fn shared_oracle(&self) -> Arc<O> {
        Arc::clone(&self.oracle)
    }

    /// Runs a full search.
    ///
    /// Worker threads, if any, live only for the duration of each batch.
    #[must_use]
    pub fn solve(&self) -> SearchRecord {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "solve",
            engine = "poset",
            dim = self.bounds.dim(),
            workers = self.config.workers,
            max_evaluations = self.config.max_evaluations
        )
        .entered();

        let root = checked(&*self.oracle, &Partition::root_center(self.bounds.dim()));
        let mut run = Run::start(&self.config, self.bounds.free_axes(), root);

        while let Some(candidates) = run.begin_round() {
            let Some(batch) = Batch::prepare(&mut run, &candidates) else {
                break;
            };
            let outcomes = pool::evaluate(
                &*self.oracle,
                &batch.points,
                &batch.owners,
                self.config.workers,
            );
            batch.merge(&mut run, &outcomes);
        }
        run.into_record()
    }
}

/// The samples of one poset round.
pub(crate) struct Batch {
    /// Plans in ascending parent id.
    plans: Vec<DivisionPlan>,
    /// All sample points, plan after plan.
    pub(crate) points: Vec<Vec<f64>>,
    /// Batch-local plan index of each point.
    pub(crate) owners: Vec<usize>,
    selection: Selection,
}

impl Batch {
    /// Selects and plans this round's regions, or terminates when not even
    /// the first one fits in the remaining budget.
    pub(crate) fn prepare(run: &mut Run<'_>, candidates: &[Candidate]) -> Option<Self> {
        let config = run.config();
        let convex = hull::potentially_optimal(
            candidates,
            run.minimum(),
            config.tolerance,
            config.lipschitz,
        );
        let round_slope = convex.largest_slope;
        let rank_slope = config
            .lipschitz
            .unwrap_or_else(|| run.largest_slope().max(round_slope));
        let mut selection = pareto::poset_selection(
            candidates,
            &convex.ids,
            config.po_set_size,
            rank_slope,
            run.minimum(),
            config.tolerance,
            config.lipschitz,
        );
        selection.largest_slope = round_slope;

        // rank order: trailing members are the first to go
        let mut plans = Vec::with_capacity(selection.ids.len());
        let mut samples = 0;
        for &id in &selection.ids {
            let plan = run.plan(id);
            if !run.fits(samples + plan.points.len()) {
                break;
            }
            samples += plan.points.len();
            plans.push(plan);
        }
        selection.ids.truncate(plans.len());
        run.note_selection(candidates, &selection);
        if plans.is_empty() {
            run.finish(TerminationReason::BudgetExhausted);
            return None;
        }

        plans.sort_by_key(|plan| plan.parent);
        let mut points = Vec::with_capacity(samples);
        let mut owners = Vec::with_capacity(samples);
        for (index, plan) in plans.iter().enumerate() {
            points.extend(plan.points.iter().cloned());
            owners.extend(core::iter::repeat_n(index, plan.points.len()));
        }
        Some(Self {
            plans,
            points,
            owners,
            selection,
        })
    }

    /// Merges the outcomes in region id order and closes the round.
    ///
    /// When a region came back with a negative value, regions after the
    /// first such one are left as leaves and their samples are not counted,
    /// evaluated or not.
    pub(crate) fn merge(&self, run: &mut Run<'_>, outcomes: &[Outcome]) {
        debug_assert_eq!(outcomes.len(), self.points.len());
        let kept = pool::cutoff(outcomes, &self.owners).map_or(self.plans.len(), |last| last + 1);

        let mut offset = 0;
        for plan in &self.plans[..kept] {
            let chunk = &outcomes[offset..offset + plan.points.len()];
            offset += plan.points.len();
            let values: Option<Vec<Option<f64>>> = chunk
                .iter()
                .map(|o| match *o {
                    Outcome::Evaluated(value) => Some(value),
                    Outcome::Abandoned => None,
                })
                .collect();
            if let Some(values) = values {
                run.count(values.len());
                run.merge(plan, &values);
            } else {
                run.count(chunk.iter().filter(|o| matches!(o, Outcome::Evaluated(_))).count());
            }
        }
        run.end_round(&self.selection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Recording;

    fn unit(dim: usize) -> Bounds {
        Bounds::new(vec![(0.0, 1.0); dim]).unwrap()
    }

    fn config(workers: usize) -> DirectConfig {
        DirectConfig::builder()
            .max_evaluations(300)
            .max_iterations(1000)
            .po_set_size(3)
            .workers(workers)
            .build()
            .unwrap()
    }

    fn landscape(x: &[f64]) -> f64 {
        (x[0] * 5.0).sin() * (x[1] * 3.0).cos() + 1.5
    }

    #[test]
    fn worker_count_does_not_change_the_result() {
        let single = PosetDirect::new(landscape, unit(2), config(1)).solve();
        let pooled = PosetDirect::new(landscape, unit(2), config(4)).solve();
        assert_eq!(single, pooled);
        assert!(single.evaluations() <= 300);
    }

    #[test]
    fn rounds_respect_po_set_size() {
        let record = PosetDirect::new(landscape, unit(2), config(2)).solve();
        assert!(record.largest_selection() <= 3);
        for summary in record.history() {
            assert!(summary.selected <= 3);
            assert!((summary.leaf_volume - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn evaluations_match_oracle_calls() {
        let engine = PosetDirect::new(Recording::new(landscape), unit(2), config(3));
        let record = engine.solve();
        assert_eq!(engine.oracle().len(), record.evaluations());
    }

    #[test]
    fn tight_budget_drops_trailing_members() {
        // root + 4 samples leaves room for exactly one more 2-d region
        let config = DirectConfig::builder()
            .max_evaluations(9)
            .po_set_size(4)
            .build()
            .unwrap();
        let engine = PosetDirect::new(Recording::new(landscape), unit(2), config);
        let record = engine.solve();
        assert!(record.evaluations() <= 9);
        assert_eq!(engine.oracle().len(), record.evaluations());
        assert_eq!(record.termination(), TerminationReason::BudgetExhausted);
    }
}
