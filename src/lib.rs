#![deny(clippy::all)]

//! An exact piecewise-linear robustness monitor for [Signal Temporal Logic]
//! formulas.
//!
//! Temporal logic formulas are a system for evaluating logical propositions
//! over time. Behavioral requirements for a continuous system, like _the
//! altitude should always stay above zero_ or _whenever the brake is pressed,
//! the speed should drop below 5 within 3 seconds_, can be written as STL
//! formulas and checked against recorded behaviors. Instead of a yes/no
//! verdict, this crate computes [robustness]: a real-valued signal of time
//! whose sign indicates satisfaction and whose magnitude measures the margin
//! to the satisfaction boundary. Robustness values enable search-based
//! testing, which finds violating inputs by minimizing the margin.
//!
//! Signals are piecewise-linear: fully determined by their `(time, value)`
//! breakpoints and linearly interpolated in between. The evaluator preserves
//! that structure through every operator, inserting crossing breakpoints for
//! pointwise extrema and computing exact envelopes for windowed extrema, so
//! the result is an exact robustness signal rather than a sampling of one.
//!
//! [Signal Temporal Logic]: https://en.wikipedia.org/wiki/Temporal_logic
//! [robustness]: https://link.springer.com/chapter/10.1007/11940197_12
//!
//! # Examples
//!
//! A formula is built from [`Predicate`]s and the [`Formula`] combinators,
//! and evaluated against a [`Trace`] of named [`Signal`]s:
//!
//! ```rust
//! use fleance::{evaluate, Formula, Predicate, Signal, Trace};
//!
//! let trace = Trace::from([
//!     ("speed", Signal::try_new([20.0, 45.0, 30.0], [0.0, 4.0, 8.0])?),
//!     ("brake", Signal::try_new([0.0, 1.0], [0.0, 8.0])?),
//! ]);
//!
//! let phi = Formula::always(Predicate::new("speed").le(50.0).into());
//! let margin = evaluate(&phi, &trace)?;
//!
//! assert_eq!(margin, 5.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! The full robustness signal is available through [`compute_robustness`]:
//!
//! ```rust
//! use fleance::{compute_robustness, Formula, Predicate, Signal, Trace};
//!
//! let trace = Trace::from([("a", Signal::try_new([1.0, -1.0], [0.0, 1.0])?)]);
//! let phi = Formula::from(Predicate::new("a").gt(0.0));
//!
//! let robustness = compute_robustness(&phi, &trace)?;
//!
//! assert_eq!(robustness.value_at(0.0), Ok(1.0));
//! assert_eq!(robustness.value_at(0.5), Ok(0.0));
//! assert_eq!(robustness.value_at(1.0), Ok(-1.0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod formula;
pub mod robustness;
pub mod signal;
pub mod sync;
pub mod trace;

mod minmax;

#[cfg(feature = "parser")]
pub mod parser;

pub use crate::formula::{Comparison, Formula, Interval, Predicate};
pub use crate::robustness::{compute_robustness, evaluate, EvaluationError};
pub use crate::signal::{InvalidSignal, OutOfDomain, Sample, Signal};
pub use crate::sync::{synchronize, synchronize_all, DisjointDomains};
pub use crate::trace::Trace;

#[cfg(feature = "parser")]
pub use crate::parser::{parse_formula, ParseError};
