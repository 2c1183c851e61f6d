use crate::bounds::Bounds;
use crate::config::DirectConfig;
use crate::hull;
use crate::oracle::{Oracle, checked};
use crate::partition::Partition;
use crate::record::SearchRecord;
use crate::types::TerminationReason;

use super::Run;

/// Lower-bounded DIRECT, evaluating one point at a time.
///
/// Each round selects the potentially optimal leaves (vertices of the lower
/// convex hull of `(size, value)` that pass the lower-bound test) and
/// subdivides them in ascending id order. Samples are evaluated in sequence
/// and the search stops right after the region that produced the first
/// negative value.
///
/// # Examples
///
/// ```
/// use lbdirect::prelude::*;
///
/// // A margin that drops below zero in a small band around x = 0.8.
/// let oracle = |x: &[f64]| if (x[0] - 0.8).abs() < 0.05 { -1.0 } else { 1.0 + x[0] };
/// let bounds = Bounds::new([(0.0, 1.0)]).unwrap();
/// let config = DirectConfig::builder()
///     .max_iterations(500)
///     .build()
///     .unwrap();
///
/// let record = LowBoundedDirect::new(oracle, bounds, config).solve();
/// assert!(record.is_falsified());
/// assert!((record.optimal_result()[0] - 0.8).abs() < 0.05);
/// ```
#[derive(Debug)]
pub struct LowBoundedDirect<O> {
    oracle: O,
    bounds: Bounds,
    config: DirectConfig,
}

impl<O: Oracle> LowBoundedDirect<O> {
    /// Creates an engine over the unit cube of `bounds`.
    ///
    /// The oracle receives unit-cube points; wrap it with
    /// [`Bounds::rescaled`] to evaluate in real coordinates instead.
    #[must_use]
    pub fn new(oracle: O, bounds: Bounds, config: DirectConfig) -> Self {
        Self {
            oracle,
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

    /// Consumes the engine and returns the oracle.
    #[must_use]
    pub fn into_oracle(self) -> O {
        self.oracle
    }

    /// Runs a full search.
    ///
    /// Every call starts from a fresh partition, so an engine can be solved
    /// repeatedly (or from several threads when `O: Sync`).
    #[must_use]
    pub fn solve(&self) -> SearchRecord {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!(
            "solve",
            engine = "sequential",
            dim = self.bounds.dim(),
            max_evaluations = self.config.max_evaluations
        )
        .entered();

        let root = checked(&self.oracle, &Partition::root_center(self.bounds.dim()));
        let mut run = Run::start(&self.config, self.bounds.free_axes(), root);

        while let Some(candidates) = run.begin_round() {
            let selection = hull::potentially_optimal(
                &candidates,
                run.minimum(),
                self.config.tolerance,
                self.config.lipschitz,
            );
            run.note_selection(&candidates, &selection);

            for &id in &selection.ids {
                let plan = run.plan(id);
                if !run.fits(plan.points.len()) {
                    run.finish(TerminationReason::BudgetExhausted);
                    break;
                }
                let values: Vec<Option<f64>> = plan
                    .points
                    .iter()
                    .map(|p| checked(&self.oracle, p))
                    .collect();
                run.count(values.len());
                run.merge(&plan, &values);
                if !run.is_running() {
                    break;
                }
            }
            run.end_round(&selection);
        }
        run.into_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Recording;

    fn unit(dim: usize) -> Bounds {
        Bounds::new(vec![(0.0, 1.0); dim]).unwrap()
    }

    #[test]
    fn bowl_reaches_its_floor() {
        let config = DirectConfig::builder()
            .max_evaluations(50)
            .build()
            .unwrap();
        let engine = LowBoundedDirect::new(
            |x: &[f64]| 4.0 * (x[0] - 0.5).powi(2) + 0.01,
            unit(1),
            config,
        );
        let record = engine.solve();
        assert!((record.minimum() - 0.01).abs() < 1e-12);
        assert_eq!(record.optimal_result(), &[0.5]);
        assert!(record.evaluations() <= 50);
        assert!(!record.is_falsified());
    }

    #[test]
    fn evaluation_count_matches_oracle_calls() {
        let config = DirectConfig::builder()
            .max_evaluations(120)
            .max_iterations(1000)
            .build()
            .unwrap();
        let engine = LowBoundedDirect::new(
            Recording::new(|x: &[f64]| (x[0] - 0.2).powi(2) + (x[1] - 0.9).abs() + 0.1),
            unit(2),
            config,
        );
        let record = engine.solve();
        assert_eq!(engine.oracle().len(), record.evaluations());
        assert!(record.evaluations() <= 120);
    }

    #[test]
    fn history_tracks_rounds() {
        let config = DirectConfig::builder()
            .max_evaluations(200)
            .max_iterations(8)
            .build()
            .unwrap();
        let engine =
            LowBoundedDirect::new(|x: &[f64]| x[0] + 2.0 * x[1] + 0.5, unit(2), config);
        let record = engine.solve();
        assert_eq!(record.history().len(), record.rounds());
        for (i, summary) in record.history().iter().enumerate() {
            assert_eq!(summary.round, i + 1);
            assert!((summary.leaf_volume - 1.0).abs() < 1e-9);
        }
        for pair in record.history().windows(2) {
            assert!(pair[1].minimum <= pair[0].minimum);
            assert!(pair[1].evaluations > pair[0].evaluations);
        }
    }

    #[test]
    fn solving_twice_gives_the_same_record() {
        let engine = LowBoundedDirect::new(
            |x: &[f64]| (x[0] * 7.0).sin() + x[1] + 1.5,
            unit(2),
            DirectConfig::builder().max_evaluations(150).build().unwrap(),
        );
        assert_eq!(engine.solve(), engine.solve());
    }

    #[test]
    fn fixed_axis_stays_at_center() {
        let bounds = Bounds::new([(0.0, 1.0), (2.0, 2.0)]).unwrap();
        let oracle = Recording::new(|x: &[f64]| (x[0] - 0.1).abs() + 0.2);
        let engine = LowBoundedDirect::new(oracle, bounds, DirectConfig::default());
        let record = engine.solve();
        let (_, log) = engine.into_oracle().into_parts();
        assert!(log.iter().all(|e| e.point[1] == 0.5));
        assert_eq!(record.optimal_result()[1], 0.5);
    }
}
