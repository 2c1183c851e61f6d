//! The [`Oracle`] trait: the objective the engines minimize.
//!
//! An oracle maps a point of the unit cube `[0,1]^d` to a margin value. A
//! negative value means the classifier's prediction flipped at that point,
//! which falsifies the robustness claim; a non-negative value means no
//! violation was detected there.
//!
//! Plain closures are oracles:
//!
//! ```
//! use lbdirect::prelude::*;
//!
//! let bounds = Bounds::new([(0.0, 1.0)]).unwrap();
//! let engine = LowBoundedDirect::new(
//!     |x: &[f64]| 4.0 * (x[0] - 0.5).powi(2) - 0.01,
//!     bounds,
//!     DirectConfig::default(),
//! );
//! let record = engine.solve();
//! assert!(record.minimum() < 0.0);
//! ```
//!
//! Implement the trait on a struct to report failures explicitly, or to
//! batch a whole round into one call (for example one forward pass over a
//! stack of transformed images):
//!
//! ```
//! use lbdirect::Oracle;
//!
//! struct Margin;
//!
//! impl Oracle for Margin {
//!     type Error = String;
//!
//!     fn evaluate(&self, point: &[f64]) -> Result<f64, String> {
//!         if point.is_empty() {
//!             return Err("empty point".into());
//!         }
//!         Ok(point.iter().sum::<f64>() - 0.5)
//!     }
//!
//!     fn evaluate_batch(&self, points: &[Vec<f64>]) -> Vec<Result<f64, String>> {
//!         points.iter().map(|p| self.evaluate(p)).collect()
//!     }
//! }
//!
//! assert_eq!(Margin.evaluate(&[0.25, 0.5]), Ok(0.25));
//! ```

use core::convert::Infallible;

use parking_lot::Mutex;

/// An objective evaluated at the centers of the search regions.
///
/// # Thread safety
///
/// [`LowBoundedDirect`](crate::LowBoundedDirect) calls the oracle from the
/// thread running `solve`. [`PosetDirect`](crate::PosetDirect) with more than
/// one worker calls it concurrently for independent points and therefore
/// additionally requires `Sync`; the oracle must not rely on shared mutable
/// state to produce its values.
pub trait Oracle {
    /// The error type returned by [`evaluate`](Oracle::evaluate).
    type Error: ToString;

    /// Evaluates the margin at a unit-cube point.
    ///
    /// The engines only pass points inside `[0,1]^d`.
    ///
    /// # Errors
    ///
    /// Any error whose type implements `ToString`. Errors and non-finite
    /// values are both treated as oracle failures: the region is marked
    /// invalid and never selected again.
    fn evaluate(&self, point: &[f64]) -> Result<f64, Self::Error>;

    /// Evaluates a batch of independent points.
    ///
    /// Used by the poset engine when it runs without a worker pool. The
    /// result must contain exactly one entry per point, in order.
    ///
    /// Default: calls [`evaluate`](Oracle::evaluate) for each point.
    fn evaluate_batch(&self, points: &[Vec<f64>]) -> Vec<Result<f64, Self::Error>> {
        points.iter().map(|p| self.evaluate(p)).collect()
    }
}

impl<F> Oracle for F
where
    F: Fn(&[f64]) -> f64,
{
    type Error = Infallible;

    fn evaluate(&self, point: &[f64]) -> Result<f64, Infallible> {
        Ok(self(point))
    }
}

/// One logged oracle call.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// The unit-cube point that was evaluated.
    pub point: Vec<f64>,
    /// The returned value, or the error message.
    pub value: Result<f64, String>,
}

/// Oracle adapter that logs every call, in completion order.
///
/// Useful to audit a search after the fact, for instance to replay the
/// sampled points through the transform layer.
///
/// ```
/// use lbdirect::Oracle;
/// use lbdirect::oracle::Recording;
///
/// let oracle = Recording::new(|x: &[f64]| x[0] * 2.0);
/// oracle.evaluate(&[0.25]).unwrap();
/// assert_eq!(oracle.len(), 1);
/// assert_eq!(oracle.evaluations()[0].value, Ok(0.5));
/// ```
#[derive(Debug)]
pub struct Recording<O> {
    inner: O,
    log: Mutex<Vec<Evaluation>>,
}

impl<O> Recording<O> {
    /// Wraps an oracle.
    #[must_use]
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Number of calls logged so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Returns `true` if nothing was evaluated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }

    /// A snapshot of the log.
    #[must_use]
    pub fn evaluations(&self) -> Vec<Evaluation> {
        self.log.lock().clone()
    }

    /// Returns the wrapped oracle and the log.
    #[must_use]
    pub fn into_parts(self) -> (O, Vec<Evaluation>) {
        (self.inner, self.log.into_inner())
    }
}

impl<O: Oracle> Oracle for Recording<O> {
    type Error = O::Error;

    fn evaluate(&self, point: &[f64]) -> Result<f64, Self::Error> {
        let result = self.inner.evaluate(point);
        let value = match &result {
            Ok(v) => Ok(*v),
            Err(e) => Err(e.to_string()),
        };
        self.log.lock().push(Evaluation {
            point: point.to_vec(),
            value,
        });
        result
    }
}

/// Runs one oracle call and rejects errors and non-finite values.
pub(crate) fn checked<O: Oracle + ?Sized>(oracle: &O, point: &[f64]) -> Option<f64> {
    screen(point, oracle.evaluate(point))
}

/// Turns a raw oracle result into a usable value, logging failures.
pub(crate) fn screen<E: ToString>(point: &[f64], result: Result<f64, E>) -> Option<f64> {
    let failure = match result {
        Ok(v) if v.is_finite() => return Some(v),
        Ok(v) => crate::Error::OracleFailure {
            point: point.to_vec(),
            reason: format!("non-finite value {v}"),
        },
        Err(e) => crate::Error::OracleFailure {
            point: point.to_vec(),
            reason: e.to_string(),
        },
    };
    trace_debug!(error = %failure, "oracle failure, region marked invalid");
    #[cfg(not(feature = "tracing"))]
    let _ = failure;
    None
}
