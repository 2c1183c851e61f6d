//! Batch evaluation for the poset engine.
//!
//! A batch is a flat list of sample points. It is evaluated either with one
//! [`Oracle::evaluate_batch`] call or on a pool of scoped worker threads fed
//! through a job channel. Admission is decided per region: the first sample
//! of a region to be picked up decides for all of them, so a region is
//! either evaluated completely or not at all. Once a region reports a
//! negative value, regions after it in the batch are no longer admitted;
//! regions before it always are, so the prefix up to the first falsifying
//! region is complete whatever the timing.

use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread;

use crossbeam_channel::unbounded;

use crate::oracle::{Oracle, screen};

/// What happened to one sample of a batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Outcome {
    /// The oracle was called; `None` marks a failure.
    Evaluated(Option<f64>),
    /// Skipped after a counterexample was found.
    Abandoned,
}

impl Outcome {
    /// Screens one raw oracle result into an outcome.
    pub(crate) fn evaluated<E: ToString>(point: &[f64], result: Result<f64, E>) -> Self {
        Self::Evaluated(screen(point, result))
    }

    pub(crate) fn is_negative(self) -> bool {
        matches!(self, Self::Evaluated(Some(v)) if v < 0.0)
    }
}

const OPEN: u8 = 0;
const RUNNING: u8 = 1;
const CLOSED: u8 = 2;

/// Lowest falsifying region plus the per-region admission state of one batch.
#[derive(Debug)]
pub(crate) struct Gate {
    first_negative: AtomicUsize,
    regions: Vec<AtomicU8>,
}

impl Gate {
    pub(crate) fn new(n_regions: usize) -> Self {
        Self {
            first_negative: AtomicUsize::new(usize::MAX),
            regions: (0..n_regions).map(|_| AtomicU8::new(OPEN)).collect(),
        }
    }

    /// Returns `true` if a sample of `region` should be evaluated.
    ///
    /// The first call for a region opens it, or closes it when a region
    /// before it already reported a negative value; later calls follow that
    /// decision.
    pub(crate) fn admit(&self, region: usize) -> bool {
        let target = if region > self.first_negative.load(Ordering::Acquire) {
            CLOSED
        } else {
            RUNNING
        };
        match self.regions[region].compare_exchange(OPEN, target, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => target == RUNNING,
            Err(current) => current == RUNNING,
        }
    }

    /// Records a negative outcome of `region`.
    pub(crate) fn report(&self, region: usize, outcome: Outcome) {
        if outcome.is_negative() {
            self.first_negative.fetch_min(region, Ordering::AcqRel);
        }
    }
}

/// Index of the first region, in batch order, with a negative outcome.
///
/// Only the regions up to and including it count for the round: they are
/// complete in every evaluation mode, the ones after it are not.
pub(crate) fn cutoff(outcomes: &[Outcome], owners: &[usize]) -> Option<usize> {
    outcomes
        .iter()
        .zip(owners)
        .filter(|(o, _)| o.is_negative())
        .map(|(_, &owner)| owner)
        .min()
}

/// Evaluates `points`, returning one outcome per point in input order.
///
/// `owners[i]` is the batch-local index of the region point `i` belongs to;
/// the points of one region must be contiguous.
pub(crate) fn evaluate<O>(
    oracle: &O,
    points: &[Vec<f64>],
    owners: &[usize],
    workers: usize,
) -> Vec<Outcome>
where
    O: Oracle + Sync + ?Sized,
{
    debug_assert_eq!(points.len(), owners.len());
    if workers <= 1 || points.len() <= 1 {
        single_call(oracle, points)
    } else {
        pooled(oracle, points, owners, workers)
    }
}

/// One vectorized oracle call for the whole batch.
///
/// Missing results count as failures; surplus results are ignored.
pub(crate) fn single_call<O: Oracle + ?Sized>(oracle: &O, points: &[Vec<f64>]) -> Vec<Outcome> {
    let results = oracle.evaluate_batch(points);
    if results.len() != points.len() {
        trace_debug!(
            expected = points.len(),
            got = results.len(),
            "batch oracle returned the wrong number of results"
        );
    }
    let mut results = results.into_iter();
    points
        .iter()
        .map(|point| match results.next() {
            Some(result) => Outcome::evaluated(point, result),
            None => Outcome::evaluated(point, Err("batch returned too few results")),
        })
        .collect()
}

fn pooled<O>(oracle: &O, points: &[Vec<f64>], owners: &[usize], workers: usize) -> Vec<Outcome>
where
    O: Oracle + Sync + ?Sized,
{
    let gate = Gate::new(owners.last().map_or(0, |&last| last + 1));
    let (job_tx, job_rx) = unbounded::<usize>();
    let (done_tx, done_rx) = unbounded::<(usize, Outcome)>();
    for index in 0..points.len() {
        let _ = job_tx.send(index);
    }
    drop(job_tx);

    thread::scope(|s| {
        for _ in 0..workers.min(points.len()) {
            let job_rx = job_rx.clone();
            let done_tx = done_tx.clone();
            let gate = &gate;
            s.spawn(move || {
                for index in job_rx {
                    let outcome = if gate.admit(owners[index]) {
                        let point = &points[index];
                        Outcome::evaluated(point, oracle.evaluate(point))
                    } else {
                        Outcome::Abandoned
                    };
                    gate.report(owners[index], outcome);
                    let _ = done_tx.send((index, outcome));
                }
            });
        }
    });
    drop(done_tx);

    let mut outcomes = vec![Outcome::Abandoned; points.len()];
    for (index, outcome) in done_rx {
        outcomes[index] = outcome;
    }
    outcomes
}
