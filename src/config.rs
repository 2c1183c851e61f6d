//! Search budgets and options shared by both engines.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Options recognized by [`LowBoundedDirect`](crate::LowBoundedDirect) and
/// [`PosetDirect`](crate::PosetDirect).
///
/// Build one with [`DirectConfig::builder`]; [`Default`] gives the values
/// listed below.
///
/// | Option | Default | Description |
/// |--------|---------|-------------|
/// | `max_evaluations` | 3000 | Oracle calls allowed, including the root |
/// | `max_deep` | 6 | Division depth at which a region stops being subdivided |
/// | `max_iterations` | 50 | Rounds allowed |
/// | `tolerance` | 1e-4 | Required improvement, for the lower-bound test and convergence |
/// | `po_set_size` | 2 | Frontier members subdivided per round (poset engine) |
/// | `lipschitz` | `None` | Assumed Lipschitz constant; `None` uses hull slopes |
/// | `workers` | 1 | Evaluation threads for the poset engine |
/// | `debug` | `false` | Round-by-round debug events; no behavioral effect |
///
/// With the `serde` feature, missing fields deserialize to their defaults.
/// Deserialized values are not validated; pass them through
/// [`DirectConfig::validate`] before use.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DirectConfig {
    pub(crate) max_evaluations: usize,
    pub(crate) max_deep: u32,
    pub(crate) max_iterations: usize,
    pub(crate) tolerance: f64,
    pub(crate) po_set_size: usize,
    pub(crate) lipschitz: Option<f64>,
    pub(crate) workers: usize,
    pub(crate) debug: bool,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            max_evaluations: 3000,
            max_deep: 6,
            max_iterations: 50,
            tolerance: 1e-4,
            po_set_size: 2,
            lipschitz: None,
            workers: 1,
            debug: false,
        }
    }
}

impl DirectConfig {
    /// Creates a builder starting from the defaults.
    #[must_use]
    pub fn builder() -> DirectConfigBuilder {
        DirectConfigBuilder::new()
    }

    /// Checks every option, as [`DirectConfigBuilder::build`] does.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending option.
    pub fn validate(self) -> Result<Self> {
        DirectConfigBuilder { config: self }.build()
    }

    /// Maximum number of oracle evaluations.
    #[must_use]
    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    /// Division depth at which a region is no longer subdivided.
    #[must_use]
    pub fn max_deep(&self) -> u32 {
        self.max_deep
    }

    /// Maximum number of rounds.
    #[must_use]
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Improvement tolerance.
    #[must_use]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Maximum frontier size per poset round.
    #[must_use]
    pub fn po_set_size(&self) -> usize {
        self.po_set_size
    }

    /// The assumed Lipschitz constant, if any.
    #[must_use]
    pub fn lipschitz(&self) -> Option<f64> {
        self.lipschitz
    }

    /// Number of poset evaluation workers.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Whether round-by-round debug events are emitted.
    #[must_use]
    pub fn debug(&self) -> bool {
        self.debug
    }
}

/// Builder for [`DirectConfig`].
///
/// # Examples
///
/// ```
/// use lbdirect::DirectConfig;
///
/// let config = DirectConfig::builder()
///     .max_evaluations(500)
///     .max_iterations(200)
///     .po_set_size(4)
///     .workers(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_evaluations(), 500);
///
/// assert!(DirectConfig::builder().tolerance(-1.0).build().is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct DirectConfigBuilder {
    config: DirectConfig,
}

impl DirectConfigBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the evaluation budget. Must be at least 1 (the root center).
    #[must_use]
    pub fn max_evaluations(mut self, n: usize) -> Self {
        self.config.max_evaluations = n;
        self
    }

    /// Sets the per-region depth cap. Must be at least 1.
    #[must_use]
    pub fn max_deep(mut self, depth: u32) -> Self {
        self.config.max_deep = depth;
        self
    }

    /// Sets the round budget. Must be at least 1.
    #[must_use]
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.config.max_iterations = n;
        self
    }

    /// Sets the improvement tolerance. Must be finite and non-negative.
    #[must_use]
    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.config.tolerance = tolerance;
        self
    }

    /// Sets how many frontier members the poset engine subdivides per round.
    #[must_use]
    pub fn po_set_size(mut self, size: usize) -> Self {
        self.config.po_set_size = size;
        self
    }

    /// Assumes a Lipschitz constant for the lower-bound test.
    ///
    /// Without one, the slope of the hull is used, which recovers vanilla
    /// DIRECT.
    #[must_use]
    pub fn lipschitz(mut self, constant: f64) -> Self {
        self.config.lipschitz = Some(constant);
        self
    }

    /// Sets the number of poset evaluation workers. `1` evaluates every
    /// batch with a single [`Oracle::evaluate_batch`](crate::Oracle::evaluate_batch) call.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Enables round-by-round debug events.
    #[must_use]
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a budget or size is zero, the
    /// tolerance is negative or non-finite, or the Lipschitz constant is not
    /// a positive finite number.
    pub fn build(self) -> Result<DirectConfig> {
        let c = self.config;
        if c.max_evaluations == 0 {
            return Err(Error::InvalidConfig("max_evaluations must be at least 1"));
        }
        if c.max_iterations == 0 {
            return Err(Error::InvalidConfig("max_iterations must be at least 1"));
        }
        if c.max_deep == 0 {
            return Err(Error::InvalidConfig("max_deep must be at least 1"));
        }
        if c.po_set_size == 0 {
            return Err(Error::InvalidConfig("po_set_size must be at least 1"));
        }
        if c.workers == 0 {
            return Err(Error::InvalidConfig("workers must be at least 1"));
        }
        if !(c.tolerance.is_finite() && c.tolerance >= 0.0) {
            return Err(Error::InvalidConfig(
                "tolerance must be finite and non-negative",
            ));
        }
        if let Some(k) = c.lipschitz {
            if !(k.is_finite() && k > 0.0) {
                return Err(Error::InvalidConfig(
                    "lipschitz constant must be finite and positive",
                ));
            }
        }
        Ok(c)
    }
}
