#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! DIRECT-style global search over small parameter boxes, built to falsify
//! local robustness claims of classifiers: find a rotation, shift, scale or
//! patch perturbation at which the decision margin drops below zero, using
//! as few expensive evaluations as possible.
//!
//! # Getting Started
//!
//! ```
//! use lbdirect::prelude::*;
//!
//! // The margin of a classifier under a one-parameter transform.
//! let margin = |x: &[f64]| 4.0 * (x[0] - 0.5).powi(2) - 0.01;
//!
//! let bounds = Bounds::new([(-0.2, 0.2)]).unwrap();
//! let config = DirectConfig::builder().max_evaluations(50).build().unwrap();
//! let record = LowBoundedDirect::new(margin, bounds.clone(), config).solve();
//!
//! assert!(record.is_falsified());
//! let counterexample = bounds.to_real(record.optimal_result()).unwrap();
//! println!("margin {:.4} at {counterexample:?}", record.minimum());
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`Oracle`] | The objective: a unit-cube point in, a margin out. Negative means falsified. |
//! | [`Bounds`] | The real parameter box, mapped to `[0,1]^d` for the engines. |
//! | [`TransformSpace`](transform::TransformSpace) | Builds bounds for angle, shift, scale or patch searches. |
//! | [`DirectConfig`] | Budgets, depth cap, tolerance, frontier size, workers. |
//! | [`LowBoundedDirect`] | Sequential engine: convex-hull selection with a lower-bound test. |
//! | [`PosetDirect`] | Batched engine: truncated Pareto frontier, parallel evaluation. |
//! | [`SearchRecord`] | Best point and value, counts, termination reason, per-round history. |
//!
//! # How the search works
//!
//! The unit cube is recursively trisected. Every region is represented by
//! its center value and its size (half diagonal). Each round the engine
//! picks regions that could still hold a lower value than the incumbent,
//! samples two points per longest axis and splits them into thirds. A
//! region stops being split once every free side has been divided
//! `max_deep` times.
//!
//! The search stops at the first negative value, when the evaluation or
//! round budget runs out, when no region is left to split, or when the
//! minimum stalls and no region can beat it any more. See
//! [`TerminationReason`].
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at key search points | on |
//! | `async` | [`PosetDirect::solve_async`] on tokio's blocking pool | off |
//! | `serde` | `Serialize`/`Deserialize` on configuration, bounds and records | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

mod bounds;
mod config;
mod engine;
mod error;
mod hull;
pub mod oracle;
mod pareto;
mod partition;
mod record;
pub mod transform;
mod types;

pub use bounds::{Bounds, Rescaled};
pub use config::{DirectConfig, DirectConfigBuilder};
pub use engine::{LowBoundedDirect, PosetDirect};
pub use error::{BoundsDefect, Error, Result};
pub use oracle::Oracle;
pub use partition::RegionId;
pub use record::{RoundSummary, SearchRecord};
pub use types::TerminationReason;

/// Convenient wildcard import for the most common types.
///
/// ```
/// use lbdirect::prelude::*;
/// ```
pub mod prelude {
    pub use crate::bounds::{Bounds, Rescaled};
    pub use crate::config::{DirectConfig, DirectConfigBuilder};
    pub use crate::engine::{LowBoundedDirect, PosetDirect};
    pub use crate::error::{BoundsDefect, Error, Result};
    pub use crate::oracle::{Oracle, Recording};
    pub use crate::record::{RoundSummary, SearchRecord};
    pub use crate::transform::{Resolved, TransformSpace};
    pub use crate::types::TerminationReason;
}
