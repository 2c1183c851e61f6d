/// Errors returned by the search engines and their building blocks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Returned when the bound list cannot be searched: an interval is
    /// malformed, the list is empty, or every interval has zero width.
    #[error("invalid bounds: {0}")]
    InvalidBounds(BoundsDefect),

    /// Returned when a configuration option is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Returned when a point does not have one coordinate per axis.
    #[error("dimension mismatch: expected {expected} coordinates but got {got}")]
    DimensionMismatch {
        /// The number of axes of the bound list.
        expected: usize,
        /// The number of coordinates supplied.
        got: usize,
    },

    /// An oracle evaluation returned an error or a non-finite value.
    ///
    /// The engines never propagate this out of `solve`: the region whose
    /// center failed is marked invalid and excluded from selection.
    #[error("oracle failure at {point:?}: {reason}")]
    OracleFailure {
        /// The unit-cube point that was evaluated.
        point: Vec<f64>,
        /// Why the value was rejected.
        reason: String,
    },

    /// Returned when an async evaluation task fails.
    #[cfg(feature = "async")]
    #[error("async task error: {0}")]
    TaskError(String),
}

/// What is wrong with a rejected bound list.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsDefect {
    /// An interval is non-finite or has `low > high`.
    #[error("axis {index}: low ({low}) must be finite and <= high ({high})")]
    Interval {
        /// Position of the offending interval in the bound list.
        index: usize,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// The list has no intervals.
    #[error("the bound list is empty")]
    Empty,

    /// Every interval has zero width, leaving nothing to search.
    #[error("at least one axis must have positive width")]
    NoFreeAxes,
}

/// Convenience alias for results produced by this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;
