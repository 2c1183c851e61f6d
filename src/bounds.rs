//! Bound lists and the mapping between the unit cube and real parameters.
//!
//! The engines only ever work in normalized coordinates `[0,1]^d`. A
//! [`Bounds`] value remembers the real interval of every axis so the calling
//! layer can turn a normalized point into transform parameters (and back).
//!
//! Zero-width intervals are allowed as long as at least one axis is free:
//! such an axis is fixed at the center of the cube and never subdivided.
//!
//! # Examples
//!
//! ```
//! use lbdirect::Bounds;
//!
//! let bounds = Bounds::new([(-0.1, 0.1), (1.0, 3.0)]).unwrap();
//! let real = bounds.to_real(&[0.5, 0.25]).unwrap();
//! assert!((real[0] - 0.0).abs() < 1e-12);
//! assert!((real[1] - 1.5).abs() < 1e-12);
//!
//! let unit = bounds.to_unit(&real).unwrap();
//! assert!((unit[1] - 0.25).abs() < 1e-12);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{BoundsDefect, Error, Result};
use crate::oracle::Oracle;

/// A validated, ordered list of `(low, high)` intervals, one per axis.
///
/// With the `serde` feature, bounds serialize as a plain list of pairs and
/// are validated again when deserialized.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")
)]
pub struct Bounds {
    intervals: Vec<(f64, f64)>,
}

impl TryFrom<Vec<(f64, f64)>> for Bounds {
    type Error = Error;

    fn try_from(intervals: Vec<(f64, f64)>) -> Result<Self> {
        Self::new(intervals)
    }
}

impl From<Bounds> for Vec<(f64, f64)> {
    fn from(bounds: Bounds) -> Self {
        bounds.intervals
    }
}

impl Bounds {
    /// Creates a bound list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if an interval is non-finite or has
    /// `low > high`, if the list is empty, or if every interval has zero
    /// width.
    pub fn new(intervals: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let intervals: Vec<(f64, f64)> = intervals.into_iter().collect();
        for (index, &(low, high)) in intervals.iter().enumerate() {
            if !low.is_finite() || !high.is_finite() || low > high {
                return Err(Error::InvalidBounds(BoundsDefect::Interval {
                    index,
                    low,
                    high,
                }));
            }
        }
        if intervals.is_empty() {
            return Err(Error::InvalidBounds(BoundsDefect::Empty));
        }
        let bounds = Self { intervals };
        if bounds.n_free() == 0 {
            return Err(Error::InvalidBounds(BoundsDefect::NoFreeAxes));
        }
        Ok(bounds)
    }

    /// Number of axes, including fixed ones.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.intervals.len()
    }

    /// The intervals in axis order.
    #[must_use]
    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    /// One flag per axis: `true` when the axis has positive width.
    #[must_use]
    pub fn free_axes(&self) -> Vec<bool> {
        self.intervals.iter().map(|&(lo, hi)| hi > lo).collect()
    }

    /// Number of axes with positive width.
    #[must_use]
    pub fn n_free(&self) -> usize {
        self.intervals.iter().filter(|&&(lo, hi)| hi > lo).count()
    }

    /// Maps a unit-cube point to real parameters: `lo + u * (hi - lo)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `unit` has the wrong length.
    pub fn to_real(&self, unit: &[f64]) -> Result<Vec<f64>> {
        self.check_len(unit.len())?;
        Ok(unit
            .iter()
            .zip(&self.intervals)
            .map(|(&u, &(lo, hi))| lo + u * (hi - lo))
            .collect())
    }

    /// Maps real parameters back into the unit cube.
    ///
    /// Fixed axes map to `0.5`, the coordinate the engines use for them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `real` has the wrong length.
    pub fn to_unit(&self, real: &[f64]) -> Result<Vec<f64>> {
        self.check_len(real.len())?;
        Ok(real
            .iter()
            .zip(&self.intervals)
            .map(|(&x, &(lo, hi))| if hi > lo { (x - lo) / (hi - lo) } else { 0.5 })
            .collect())
    }

    /// Wraps a real-space oracle so it can be driven with unit-cube points.
    #[must_use]
    pub fn rescaled<O>(&self, oracle: O) -> Rescaled<O> {
        Rescaled {
            bounds: self.clone(),
            inner: oracle,
        }
    }

    fn check_len(&self, got: usize) -> Result<()> {
        if got == self.intervals.len() {
            Ok(())
        } else {
            Err(Error::DimensionMismatch {
                expected: self.intervals.len(),
                got,
            })
        }
    }
}

/// Oracle adapter that rescales unit-cube points into real bounds before
/// calling the wrapped oracle. Created by [`Bounds::rescaled`].
#[derive(Clone, Debug)]
pub struct Rescaled<O> {
    bounds: Bounds,
    inner: O,
}

impl<O> Rescaled<O> {
    /// The bounds used for rescaling.
    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Returns the wrapped oracle.
    #[must_use]
    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Oracle> Oracle for Rescaled<O> {
    type Error = String;

    fn evaluate(&self, point: &[f64]) -> core::result::Result<f64, Self::Error> {
        let real = self.bounds.to_real(point).map_err(|e| e.to_string())?;
        self.inner.evaluate(&real).map_err(|e| e.to_string())
    }
}
