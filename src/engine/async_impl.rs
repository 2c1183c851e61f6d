use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::oracle::checked;
use crate::partition::Partition;
use crate::record::SearchRecord;
use crate::{Error, Oracle};

use super::Run;
use super::pool::{self, Gate, Outcome};
use super::poset::{Batch, PosetDirect};

impl<O> PosetDirect<O>
where
    O: Oracle + Send + Sync + 'static,
{
    /// Runs a full search with evaluations on tokio's blocking pool.
    ///
    /// Rounds, selection and merging are identical to
    /// [`solve`](Self::solve); only the batch evaluation differs. With one
    /// worker each batch is a single [`Oracle::evaluate_batch`] call inside
    /// [`spawn_blocking`](tokio::task::spawn_blocking); otherwise every
    /// sample is its own blocking task, at most `workers` at a time,
    /// collected through a [`JoinSet`].
    ///
    /// # Errors
    ///
    /// Returns `Error::TaskError` if a blocking task panics or the
    /// concurrency limiter is closed.
    ///
    /// # Examples
    ///
    /// ```
    /// use lbdirect::prelude::*;
    ///
    /// # #[cfg(feature = "async")]
    /// # async fn example() -> lbdirect::Result<()> {
    /// let bounds = Bounds::new([(0.0, 1.0), (0.0, 1.0)])?;
    /// let config = DirectConfig::builder().max_evaluations(100).workers(4).build()?;
    /// let engine = PosetDirect::new(|x: &[f64]| x[0] * x[1] + 0.1, bounds, config);
    ///
    /// let record = engine.solve_async().await?;
    /// assert!(record.evaluations() <= 100);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn solve_async(&self) -> crate::Result<SearchRecord> {
        let oracle = self.shared_oracle();
        let config = self.config();
        let bounds = self.bounds();

        let root_center = Partition::root_center(bounds.dim());
        let root = {
            let oracle = Arc::clone(&oracle);
            tokio::task::spawn_blocking(move || checked(&*oracle, &root_center))
                .await
                .map_err(|e| Error::TaskError(e.to_string()))?
        };
        let mut run = Run::start(config, bounds.free_axes(), root);

        while let Some(candidates) = run.begin_round() {
            let Some(batch) = Batch::prepare(&mut run, &candidates) else {
                break;
            };
            let outcomes =
                evaluate(&oracle, &batch.points, &batch.owners, config.workers()).await?;
            batch.merge(&mut run, &outcomes);
        }
        Ok(run.into_record())
    }
}

async fn evaluate<O>(
    oracle: &Arc<O>,
    points: &[Vec<f64>],
    owners: &[usize],
    workers: usize,
) -> crate::Result<Vec<Outcome>>
where
    O: Oracle + Send + Sync + 'static,
{
    if workers <= 1 {
        let oracle = Arc::clone(oracle);
        let points = points.to_vec();
        return tokio::task::spawn_blocking(move || pool::single_call(&*oracle, &points))
            .await
            .map_err(|e| Error::TaskError(e.to_string()));
    }

    let gate = Arc::new(Gate::new(owners.last().map_or(0, |&last| last + 1)));
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut join_set: JoinSet<(usize, Outcome)> = JoinSet::new();

    for (index, (point, &owner)) in points.iter().zip(owners).enumerate() {
        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .map_err(|e| Error::TaskError(e.to_string()))?;
        let oracle = Arc::clone(oracle);
        let gate = Arc::clone(&gate);
        let point = point.clone();
        join_set.spawn_blocking(move || {
            let outcome = if gate.admit(owner) {
                Outcome::evaluated(&point, oracle.evaluate(&point))
            } else {
                Outcome::Abandoned
            };
            gate.report(owner, outcome);
            drop(permit);
            (index, outcome)
        });
    }

    let mut outcomes = vec![Outcome::Abandoned; points.len()];
    while let Some(joined) = join_set.join_next().await {
        let (index, outcome) = joined.map_err(|e| Error::TaskError(e.to_string()))?;
        outcomes[index] = outcome;
    }
    Ok(outcomes)
}
