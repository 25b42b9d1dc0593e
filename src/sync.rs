//! Synchronization of signals onto a shared time partition.
//!
//! Signals in a [`Trace`](crate::Trace) need not share breakpoint times or
//! even domains, but every pointwise combination of robustness values
//! requires both operands to be defined at the same times. [`synchronize`]
//! resamples two signals onto the union of their time partitions, confined to
//! the range where both are defined, so that each is explicitly defined at
//! every time instant the other is.
//!
//! # Examples
//!
//! ```rust
//! use fleance::{synchronize, Signal};
//!
//! let a = Signal::try_new([0.0, 2.0], [0.0, 4.0])?;
//! let b = Signal::try_new([1.0, 1.0, 3.0], [1.0, 2.0, 5.0])?;
//!
//! let (a, b) = synchronize(&a, &b)?;
//!
//! // Both outputs cover [1, 4] and share the partition {1, 2, 4}.
//! assert_eq!(a.begin_time(), b.begin_time());
//! assert_eq!(a.end_time(), b.end_time());
//! assert_eq!(a.len(), b.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use ordered_float::NotNan;
use thiserror::Error;

use crate::signal::{Sample, Signal};

/// The error type for synchronizing signals whose domains do not overlap.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("signal domains [{left_begin}, {left_end}] and [{right_begin}, {right_end}] are disjoint")]
pub struct DisjointDomains {
    pub left_begin: f64,
    pub left_end: f64,
    pub right_begin: f64,
    pub right_end: f64,
}

fn disjoint(a: &Signal, b: &Signal) -> DisjointDomains {
    DisjointDomains {
        left_begin: a.begin_time(),
        left_end: a.end_time(),
        right_begin: b.begin_time(),
        right_end: b.end_time(),
    }
}

/// Merge two chronologically ordered time sequences, dropping duplicates and
/// clipping to `[begin, end]`.
fn merge_times(a: &Signal, b: &Signal, begin: f64, end: f64) -> Vec<f64> {
    let begin = NotNan::new(begin).expect("domain bounds are never NaN");
    let end = NotNan::new(end).expect("domain bounds are never NaN");

    let mut left = a.times().peekable();
    let mut right = b.times().peekable();
    let mut times = Vec::with_capacity(a.len() + b.len());

    let mut push = |time: NotNan<f64>| {
        if time < begin || time > end {
            return;
        }

        if times.last() != Some(&time.into_inner()) {
            times.push(time.into_inner());
        }
    };

    push(begin);

    loop {
        let time = match (left.peek(), right.peek()) {
            (Some(&l), Some(&r)) => {
                if l <= r {
                    left.next()
                } else {
                    right.next()
                }
            }
            (Some(_), None) => left.next(),
            (None, Some(_)) => right.next(),
            (None, None) => break,
        };

        push(time.unwrap());
    }

    push(end);
    times
}

/// Resample two signals onto the union of their time partitions, confined to
/// the overlap of their domains.
///
/// Both output signals share an identical time axis and represent the same
/// piecewise-linear functions as the inputs over the common range, so
/// synchronizing an already-synchronized pair returns it unchanged. The cost
/// is linear in the total number of breakpoints.
///
/// # Errors
///
/// Returns [`DisjointDomains`] when the two domains do not overlap. An
/// overlap consisting of a single time instant is valid and produces a pair
/// of one-sample signals.
pub fn synchronize(a: &Signal, b: &Signal) -> Result<(Signal, Signal), DisjointDomains> {
    let begin = a.begin_time().max(b.begin_time());
    let end = a.end_time().min(b.end_time());

    if begin > end {
        return Err(disjoint(a, b));
    }

    let times = merge_times(a, b, begin, end);

    let resample = |signal: &Signal| {
        let samples = times
            .iter()
            .map(|&time| Sample::new(time, signal.eval(time)))
            .collect();

        Signal::from_samples_unchecked(samples)
    };

    Ok((resample(a), resample(b)))
}

/// Resample every signal in the sequence onto one shared time partition by
/// iterative pairwise reduction.
///
/// This is the n-ary generalization of [`synchronize`] used by conjunctions
/// and disjunctions with more than two operands: the common domain is the
/// intersection of all domains and the partition is the union of every
/// breakpoint time that falls inside it.
///
/// # Errors
///
/// Returns [`DisjointDomains`] as soon as the running domain intersection
/// becomes empty.
pub fn synchronize_all(signals: &[Signal]) -> Result<Vec<Signal>, DisjointDomains> {
    let mut iter = signals.iter();

    let mut merged = match iter.next() {
        Some(first) => first.clone(),
        None => return Ok(Vec::new()),
    };

    for signal in iter {
        let (next, _) = synchronize(signal, &merged)?;
        merged = next;
    }

    // `merged` now carries the full partition; one more pass resamples every
    // input onto it.
    let synchronized = signals
        .iter()
        .map(|signal| synchronize(signal, &merged).map(|(out, _)| out))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(synchronized)
}
