//! Search spaces for geometric transforms and localized patch perturbations.
//!
//! A [`TransformSpace`] turns the perturbation a robustness claim is stated
//! for (rotate by up to a fraction of a half turn, shift by up to `s`, scale
//! by up to `1 ± s`, or add a bounded patch to a block of pixels) into the
//! [`Bounds`] the engines search, and resolves a normalized result point back
//! into named transform parameters. Applying the transform to an image is
//! left to the caller.
//!
//! # Examples
//!
//! ```
//! use lbdirect::transform::{Resolved, TransformSpace};
//!
//! let space = TransformSpace::new().angle(0.1).shift(0.1);
//! let bounds = space.bounds().unwrap();
//! assert_eq!(bounds.dim(), 3);
//!
//! match space.resolve(&[0.5, 1.0, 0.0]).unwrap() {
//!     Resolved::Geometric(params) => {
//!         assert!(params.angle.abs() < 1e-12);
//!         assert!((params.h_shift - 0.1).abs() < 1e-12);
//!         assert!((params.v_shift + 0.1).abs() < 1e-12);
//!         assert!((params.scale - 1.0).abs() < 1e-12);
//!     }
//!     Resolved::Patch(_) => unreachable!(),
//! }
//! ```

use core::f64::consts::PI;

use crate::bounds::Bounds;
use crate::error::{Error, Result};

/// One searchable axis of a transform space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Rotation angle in radians.
    Angle,
    /// Horizontal translation, as a fraction of the image width.
    HorizontalShift,
    /// Vertical translation, as a fraction of the image height.
    VerticalShift,
    /// Isotropic scale factor.
    Scale,
    /// Additive change of one pixel value inside the patch, by flat index.
    Pixel(usize),
}

/// Named geometric parameters resolved from a search point.
///
/// Axes that are not part of the space keep their identity value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeometricParams {
    /// Rotation angle in radians.
    pub angle: f64,
    /// Horizontal translation.
    pub h_shift: f64,
    /// Vertical translation.
    pub v_shift: f64,
    /// Scale factor.
    pub scale: f64,
}

impl Default for GeometricParams {
    fn default() -> Self {
        Self {
            angle: 0.0,
            h_shift: 0.0,
            v_shift: 0.0,
            scale: 1.0,
        }
    }
}

/// A search point resolved into transform parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved {
    /// Parameters of an affine transform.
    Geometric(GeometricParams),
    /// Additive per-pixel deltas, in the order the patch pixels were given.
    Patch(Vec<f64>),
}

/// The perturbation family a robustness claim is stated for.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformSpace {
    axes: Vec<(Axis, (f64, f64))>,
    patch: bool,
}

impl TransformSpace {
    /// Creates an empty geometric space. Add axes with the chained methods.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rotation axis spanning `[-π·fraction, π·fraction]`.
    ///
    /// A zero fraction leaves the space unchanged.
    #[must_use]
    pub fn angle(mut self, fraction: f64) -> Self {
        if fraction != 0.0 {
            let half = PI * fraction.abs();
            self.axes.push((Axis::Angle, (-half, half)));
        }
        self
    }

    /// Adds horizontal and vertical shift axes spanning `[-shift, shift]`.
    ///
    /// A zero shift leaves the space unchanged.
    #[must_use]
    pub fn shift(mut self, shift: f64) -> Self {
        if shift != 0.0 {
            let s = shift.abs();
            self.axes.push((Axis::HorizontalShift, (-s, s)));
            self.axes.push((Axis::VerticalShift, (-s, s)));
        }
        self
    }

    /// Adds a scale axis spanning `[1 - scale, 1 + scale]`.
    ///
    /// A zero scale leaves the space unchanged.
    #[must_use]
    pub fn scale(mut self, scale: f64) -> Self {
        if scale != 0.0 {
            let s = scale.abs();
            self.axes.push((Axis::Scale, (1.0 - s, 1.0 + s)));
        }
        self
    }

    /// Creates a patch space over the given pixel values (in `[0, 1]`).
    ///
    /// Each pixel may change by at most `l_inf` and must stay inside
    /// `[0, 1]`, so its interval is `[max(-l_inf, -p), min(l_inf, 1 - p)]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `pixels` is empty, a pixel is
    /// outside `[0, 1]`, or `l_inf` is not positive.
    pub fn patch(pixels: &[f64], l_inf: f64) -> Result<Self> {
        if pixels.is_empty() {
            return Err(Error::InvalidConfig("patch must cover at least one pixel"));
        }
        if !(l_inf.is_finite() && l_inf > 0.0) {
            return Err(Error::InvalidConfig("patch l_inf bound must be positive"));
        }
        let axes = pixels
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                if (0.0..=1.0).contains(&p) {
                    Ok((Axis::Pixel(i), ((-l_inf).max(-p), l_inf.min(1.0 - p))))
                } else {
                    Err(Error::InvalidConfig("patch pixels must lie in [0, 1]"))
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { axes, patch: true })
    }

    /// The axes of the space, in bound-list order.
    #[must_use]
    pub fn axes(&self) -> Vec<Axis> {
        self.axes.iter().map(|&(axis, _)| axis).collect()
    }

    /// The bound list the engines should search.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBounds`] if no axis was added (or every patch
    /// interval is degenerate).
    pub fn bounds(&self) -> Result<Bounds> {
        Bounds::new(self.axes.iter().map(|&(_, interval)| interval))
    }

    /// Resolves a unit-cube point into transform parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `unit` does not have one
    /// coordinate per axis, or [`Error::InvalidBounds`] for an empty space.
    pub fn resolve(&self, unit: &[f64]) -> Result<Resolved> {
        let real = self.bounds()?.to_real(unit)?;
        if self.patch {
            return Ok(Resolved::Patch(real));
        }
        let mut params = GeometricParams::default();
        for (&(axis, _), value) in self.axes.iter().zip(real) {
            match axis {
                Axis::Angle => params.angle = value,
                Axis::HorizontalShift => params.h_shift = value,
                Axis::VerticalShift => params.v_shift = value,
                Axis::Scale => params.scale = value,
                Axis::Pixel(_) => {}
            }
        }
        Ok(Resolved::Geometric(params))
    }
}
