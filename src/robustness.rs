//! Quantitative semantics mapping formulas and traces to robustness signals.
//!
//! [`compute_robustness`] walks a [`Formula`] bottom-up. Leaves produce a
//! [`Signal`] directly from the trace: a predicate maps its signal through
//! the distance to its threshold, and a constant produces ±∞ over the trace
//! hull. Every internal node synchronizes the robustness signals of its
//! children onto a shared time partition and applies a pointwise or windowed
//! extremum, so the result at each step remains an exact piecewise-linear
//! signal.
//!
//! The sign of the result at a time indicates whether the formula is
//! satisfied starting at that time, and its magnitude is the margin: the
//! distance the trace would have to move to flip the verdict.
//!
//! # Horizon policy
//!
//! A temporal operator with window `[a, b]` shortens the domain of its
//! output: robustness at time `t` requires the subformula robustness on
//! `[t + a, t + b]`, so the result is truncated to end `a` before the
//! subformula horizon (windows reaching past the horizon are clipped to it).
//! Truncation is the only permitted partial-result behavior; when nothing of
//! the domain survives, evaluation fails with
//! [`EvaluationError::InsufficientHorizon`].
//!
//! # Examples
//!
//! ```rust
//! use fleance::{compute_robustness, evaluate, Formula, Predicate, Signal, Trace};
//!
//! let trace = Trace::from([("a", Signal::try_new([1.0, -1.0], [0.0, 1.0])?)]);
//! let phi = Formula::from(Predicate::new("a").gt(0.0));
//!
//! let robustness = compute_robustness(&phi, &trace)?;
//! assert_eq!(robustness.value_at(0.5), Ok(0.0));
//!
//! // The scalar robustness of a trace is the value at its earliest time.
//! assert_eq!(evaluate(&phi, &trace)?, 1.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use thiserror::Error;

use crate::formula::{Comparison, Formula, Interval, Predicate};
use crate::minmax::{self, Extremum};
use crate::signal::{Sample, Signal};
use crate::sync::{synchronize, DisjointDomains};
use crate::trace::Trace;

/// The error type for evaluating a formula against a trace.
///
/// Every variant indicates an input-correctness problem detected at the call
/// site; no condition is retried and no default robustness value is ever
/// substituted.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EvaluationError {
    /// A predicate references a signal name the trace does not contain.
    #[error("formula references signal \"{name}\" which is not present in the trace")]
    UnknownSignal { name: String },

    /// A constant formula cannot produce a domain from an empty trace.
    #[error("cannot evaluate a constant formula over an empty trace")]
    EmptyTrace,

    /// Two robustness signals being combined have no common time range.
    #[error(transparent)]
    DisjointDomains(#[from] DisjointDomains),

    /// A temporal operator carries an interval with `lower < 0`,
    /// `lower > upper`, or a NaN endpoint.
    #[error("invalid interval {interval}: bounds must satisfy 0 <= lower <= upper")]
    InvalidInterval { interval: Interval },

    /// A window lower bound pushes past the subformula horizon, leaving no
    /// output domain after truncation.
    #[error("window lower bound {lower} exceeds the subformula horizon [{begin}, {end}]")]
    InsufficientHorizon { lower: f64, begin: f64, end: f64 },
}

/// Compute the robustness signal of a formula over a trace.
///
/// See the [module-level documentation](self) for the semantics of each
/// syntax node and the domain policy of the temporal operators.
pub fn compute_robustness(formula: &Formula, trace: &Trace) -> Result<Signal, EvaluationError> {
    match formula {
        Formula::Const(value) => {
            let (begin, end) = trace.hull().ok_or(EvaluationError::EmptyTrace)?;
            let metric = if *value { f64::INFINITY } else { f64::NEG_INFINITY };
            let signal = Signal::constant(begin, end, metric)
                .expect("trace hull bounds are finite and ordered");

            Ok(signal)
        }

        Formula::Predicate(predicate) => predicate_robustness(predicate, trace),

        Formula::Not(subformula) => compute_robustness(subformula, trace).map(negate),

        Formula::And(operands) => {
            let mut result = compute_robustness(&operands.head, trace)?;

            for operand in &operands.tail {
                let next = compute_robustness(operand, trace)?;
                let (a, b) = synchronize(&result, &next)?;
                result = minmax::min_pair(&a, &b);
            }

            Ok(result)
        }

        Formula::Or(operands) => {
            let mut result = compute_robustness(&operands.head, trace)?;

            for operand in &operands.tail {
                let next = compute_robustness(operand, trace)?;
                let (a, b) = synchronize(&result, &next)?;
                result = minmax::max_pair(&a, &b);
            }

            Ok(result)
        }

        Formula::Always {
            subformula,
            interval,
        } => {
            let robustness = compute_robustness(subformula, trace)?;
            timed_extremum(robustness, interval.as_ref(), Extremum::Min)
        }

        Formula::Eventually {
            subformula,
            interval,
        } => {
            let robustness = compute_robustness(subformula, trace)?;
            timed_extremum(robustness, interval.as_ref(), Extremum::Max)
        }

        Formula::Until {
            left,
            right,
            interval,
        } => until(left, right, interval.as_ref(), trace),
    }
}

/// Evaluate a formula into its scalar robustness: the value of the
/// robustness signal at the earliest time of its domain.
///
/// # Examples
///
/// ```rust
/// use fleance::{evaluate, Formula, Predicate, Signal, Trace};
///
/// let trace = Trace::from([("speed", Signal::try_new([30.0, 50.0], [0.0, 10.0])?)]);
/// let phi = Formula::always(Predicate::new("speed").le(55.0).into());
///
/// assert_eq!(evaluate(&phi, &trace)?, 5.0);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn evaluate(formula: &Formula, trace: &Trace) -> Result<f64, EvaluationError> {
    compute_robustness(formula, trace).map(|signal| signal.samples()[0].value)
}

fn negate(signal: Signal) -> Signal {
    let samples = signal
        .iter()
        .map(|s| Sample::new(s.time, -s.value))
        .collect();

    Signal::from_samples_unchecked(samples)
}

fn predicate_robustness(predicate: &Predicate, trace: &Trace) -> Result<Signal, EvaluationError> {
    let signal = trace
        .get(predicate.name())
        .ok_or_else(|| EvaluationError::UnknownSignal {
            name: predicate.name().to_owned(),
        })?;

    let threshold = predicate.threshold();

    let samples = match predicate.comparison() {
        Comparison::Gt | Comparison::Ge => signal
            .iter()
            .map(|s| Sample::new(s.time, s.value - threshold))
            .collect(),

        Comparison::Lt | Comparison::Le => signal
            .iter()
            .map(|s| Sample::new(s.time, threshold - s.value))
            .collect(),

        Comparison::Eq => threshold_distance(signal, threshold, -1.0),
        Comparison::Ne => threshold_distance(signal, threshold, 1.0),
    };

    Ok(Signal::from_samples_unchecked(samples))
}

/// Signed distance `±|s − c|` with a zero breakpoint inserted at every time
/// the signal crosses the threshold, where the absolute value kinks.
fn threshold_distance(signal: &Signal, threshold: f64, sign: f64) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(2 * signal.len());
    let mut prev: Option<Sample> = None;

    for &sample in signal.iter() {
        if let Some(p) = prev {
            let d1 = p.value - threshold;
            let d2 = sample.value - threshold;

            if minmax::straddles(d1, d2) {
                let time = minmax::crossing_time(p.time, sample.time, d1, d2);

                if time > p.time && time < sample.time {
                    samples.push(Sample::new(time, 0.0));
                }
            }
        }

        samples.push(Sample::new(
            sample.time,
            sign * (sample.value - threshold).abs(),
        ));
        prev = Some(sample);
    }

    samples
}

fn validate_interval(interval: &Interval) -> Result<(f64, Option<f64>), EvaluationError> {
    let lower = interval.lower();
    let upper = interval.upper();

    let valid_lower = lower.is_finite() && lower >= 0.0;
    let valid_upper = upper.map_or(true, |upper| upper >= lower);

    if valid_lower && valid_upper {
        Ok((lower, upper))
    } else {
        Err(EvaluationError::InvalidInterval {
            interval: *interval,
        })
    }
}

/// Windowed extremum semantics shared by `Always` and `Eventually`.
fn timed_extremum(
    robustness: Signal,
    interval: Option<&Interval>,
    extremum: Extremum,
) -> Result<Signal, EvaluationError> {
    let (lower, upper) = match interval {
        None => (0.0, None),
        Some(interval) => validate_interval(interval)?,
    };

    let begin = robustness.begin_time();
    let end = robustness.end_time();

    let envelope = match upper {
        None => minmax::running_extremum(&robustness, extremum),
        // A degenerate window reads a single future value.
        Some(upper) if upper == lower => robustness,
        Some(upper) => minmax::window_extremum(&robustness, upper - lower, extremum),
    };

    retime(envelope, lower, begin, end)
}

/// Shift a windowed envelope back by the window's lower bound and truncate
/// the output domain to the times whose window intersects the horizon.
fn retime(envelope: Signal, lower: f64, begin: f64, end: f64) -> Result<Signal, EvaluationError> {
    if lower == 0.0 {
        return Ok(envelope);
    }

    envelope
        .shift(-lower)
        .truncated(begin, end - lower)
        .ok_or(EvaluationError::InsufficientHorizon { lower, begin, end })
}

fn until(
    left: &Formula,
    right: &Formula,
    interval: Option<&Interval>,
    trace: &Trace,
) -> Result<Signal, EvaluationError> {
    let r1 = compute_robustness(left, trace)?;
    let r2 = compute_robustness(right, trace)?;

    let (lower, upper) = match interval {
        None => (0.0, None),
        Some(interval) => validate_interval(interval)?,
    };

    let unbounded = until_unbounded(&r1, &r2)?;

    if lower == 0.0 && upper.is_none() {
        return Ok(unbounded);
    }

    // Bounded untils decompose into already-exact parts:
    //
    //   r1 U[a,b] r2 = min( F[a,b] r2, G[0,a] r1, (r1 U r2) shifted by a )
    //
    // The unbounded until shifted to the window start carries the
    // sup-of-running-infima structure, the G term accounts for r1 over
    // [t, t+a], and the F term caps the witness search at t+b.
    let begin = unbounded.begin_time();
    let end = unbounded.end_time();
    let mut result = retime(unbounded, lower, begin, end)?;

    if lower > 0.0 {
        let guard = timed_extremum(r1, Some(&Interval::bounded(0.0, lower)), Extremum::Min)?;
        let (a, b) = synchronize(&result, &guard)?;
        result = minmax::min_pair(&a, &b);
    }

    if let Some(upper) = upper {
        let reach = timed_extremum(r2, Some(&Interval::bounded(lower, upper)), Extremum::Max)?;
        let (a, b) = synchronize(&result, &reach)?;
        result = minmax::min_pair(&a, &b);
    }

    Ok(result)
}

/// Unbounded until over the synchronized, crossing-refined partition.
///
/// One right-to-left pass maintains the recursion
/// `U_i = max(A_i, min(inf_seg r1, U_{i+1}))` where `A_i` is the supremum of
/// `min(r2, running inf of r1)` inside segment `i`. When r1 is non-decreasing
/// on the segment its running infimum is pinned at the left endpoint; when it
/// is decreasing the running infimum follows r1 itself and the crossing
/// refinement makes `min(r1, r2)` linear, so both cases reduce to endpoint
/// arithmetic.
fn until_unbounded(r1: &Signal, r2: &Signal) -> Result<Signal, DisjointDomains> {
    let (x, y) = synchronize(r1, r2)?;
    let (x, y) = minmax::refine_crossings(&x, &y);

    let xs = x.samples();
    let ys = y.samples();
    let count = xs.len();

    let mut carry = f64::min(xs[count - 1].value, ys[count - 1].value);
    let mut samples = Vec::with_capacity(count);
    samples.push(Sample::new(xs[count - 1].time, carry));

    for i in (0..count - 1).rev() {
        let (x0, x1) = (xs[i], xs[i + 1]);
        let (y0, y1) = (ys[i], ys[i + 1]);

        let segment_inf = f64::min(x0.value, x1.value);

        let segment_sup = if x0.value <= x1.value {
            f64::min(x0.value, f64::max(y0.value, y1.value))
        } else {
            f64::max(
                f64::min(x0.value, y0.value),
                f64::min(x1.value, y1.value),
            )
        };

        carry = f64::max(segment_sup, f64::min(segment_inf, carry));
        samples.push(Sample::new(x0.time, carry));
    }

    samples.reverse();
    Ok(Signal::from_samples_unchecked(samples).simplify())
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::{compute_robustness, evaluate, EvaluationError};
    use crate::formula::{Formula, Interval, Predicate};
    use crate::signal::Signal;
    use crate::trace::Trace;

    fn trace_with(name: &str, values: &[f64], times: &[f64]) -> Trace {
        let signal = Signal::try_new(values.to_vec(), times.to_vec()).unwrap();
        Trace::from([(name, signal)])
    }

    #[test]
    fn predicate_distances() {
        let trace = trace_with("a", &[1.0, -1.0], &[0.0, 1.0]);

        let above = Formula::from(Predicate::new("a").gt(0.0));
        let robustness = compute_robustness(&above, &trace).unwrap();

        assert_eq!(robustness.value_at(0.0), Ok(1.0));
        assert_eq!(robustness.value_at(0.5), Ok(0.0));
        assert_eq!(robustness.value_at(1.0), Ok(-1.0));

        let below = Formula::from(Predicate::new("a").le(0.0));
        let robustness = compute_robustness(&below, &trace).unwrap();

        assert_eq!(robustness.value_at(0.0), Ok(-1.0));
        assert_eq!(robustness.value_at(1.0), Ok(1.0));
    }

    #[test]
    fn equality_distance_kinks_at_crossing() {
        let trace = trace_with("a", &[1.0, -1.0], &[0.0, 1.0]);

        let phi = Formula::from(Predicate::new("a").eq(0.0));
        let robustness = compute_robustness(&phi, &trace).unwrap();

        // -|a| kinks to zero exactly where the signal crosses the threshold.
        assert_eq!(robustness.value_at(0.0), Ok(-1.0));
        assert_eq!(robustness.value_at(0.5), Ok(0.0));
        assert_eq!(robustness.value_at(0.75), Ok(-0.5));
        assert_eq!(robustness.value_at(1.0), Ok(-1.0));

        let phi = Formula::from(Predicate::new("a").ne(0.0));
        let robustness = compute_robustness(&phi, &trace).unwrap();

        assert_eq!(robustness.value_at(0.5), Ok(0.0));
        assert_eq!(robustness.value_at(1.0), Ok(1.0));
    }

    #[test]
    fn unknown_signal() {
        let trace = trace_with("a", &[1.0, 2.0], &[0.0, 1.0]);
        let phi = Formula::from(Predicate::new("c").gt(0.0));

        assert_eq!(
            compute_robustness(&phi, &trace),
            Err(EvaluationError::UnknownSignal { name: "c".into() })
        );
    }

    #[test]
    fn constants() {
        let trace = trace_with("a", &[1.0, 2.0], &[0.0, 1.0]);

        let top = compute_robustness(&Formula::from(true), &trace).unwrap();
        assert_eq!(top.value_at(0.5), Ok(f64::INFINITY));

        let bottom = compute_robustness(&Formula::from(false), &trace).unwrap();
        assert_eq!(bottom.value_at(0.5), Ok(f64::NEG_INFINITY));

        assert_eq!(
            compute_robustness(&Formula::from(true), &Trace::new()),
            Err(EvaluationError::EmptyTrace)
        );
    }

    #[test]
    fn conjunction_is_pointwise_minimum() {
        let a = Signal::try_new([0.0, 2.0], [0.0, 2.0]).unwrap();
        let b = Signal::try_new([2.0, 0.0], [0.0, 2.0]).unwrap();
        let trace = Trace::from([("a", a), ("b", b)]);

        let phi = Formula::and(
            Predicate::new("a").gt(0.0).into(),
            Predicate::new("b").gt(0.0).into(),
        );
        let robustness = compute_robustness(&phi, &trace).unwrap();

        for t in [0.0, 0.25, 0.5, 1.0, 1.5, 2.0] {
            let expected = f64::min(t, 2.0 - t);
            assert_relative_eq!(robustness.value_at(t).unwrap(), expected);
        }
    }

    #[test]
    fn degenerate_always_window_is_identity() {
        let trace = trace_with("a", &[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]);

        let phi = Formula::from(Predicate::new("a").gt(0.0));
        let plain = compute_robustness(&phi, &trace).unwrap();

        let windowed = Formula::always_within(0.0..=0.0, phi);
        let degenerate = compute_robustness(&windowed, &trace).unwrap();

        assert_eq!(plain, degenerate);
    }

    #[test]
    fn always_truncates_horizon() {
        let trace = trace_with("a", &[1.0, 1.0], &[0.0, 10.0]);

        let phi = Formula::always_within(2.0..=4.0, Predicate::new("a").gt(0.0).into());
        let robustness = compute_robustness(&phi, &trace).unwrap();

        assert_eq!(robustness.begin_time(), 0.0);
        assert_eq!(robustness.end_time(), 8.0);
    }

    #[test]
    fn insufficient_horizon() {
        let trace = trace_with("a", &[1.0, 1.0], &[0.0, 1.0]);

        let phi = Formula::always_within(5.0..=6.0, Predicate::new("a").gt(0.0).into());

        assert!(matches!(
            compute_robustness(&phi, &trace),
            Err(EvaluationError::InsufficientHorizon { .. })
        ));
    }

    #[test]
    fn invalid_intervals() {
        let trace = trace_with("a", &[1.0, 1.0], &[0.0, 1.0]);
        let p = || Formula::from(Predicate::new("a").gt(0.0));

        let backwards = Formula::always_within(Interval::bounded(2.0, 1.0), p());
        let negative = Formula::eventually_within(Interval::bounded(-1.0, 1.0), p());

        assert!(matches!(
            compute_robustness(&backwards, &trace),
            Err(EvaluationError::InvalidInterval { .. })
        ));
        assert!(matches!(
            compute_robustness(&negative, &trace),
            Err(EvaluationError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn until_scenario() {
        // a stays positive while b decays through zero; the best witness time
        // is the end of the trace where b has fully decayed.
        let a = Signal::try_new([1.0, 1.0], [0.0, 10.0]).unwrap();
        let b = Signal::try_new([1.0, -1.0], [0.0, 10.0]).unwrap();
        let trace = Trace::from([("a", a), ("b", b)]);

        let phi = Formula::until(
            Predicate::new("a").gt(0.0).into(),
            Predicate::new("b").le(0.0).into(),
        );
        let robustness = compute_robustness(&phi, &trace).unwrap();

        // sup over t' of min(-b(t'), inf a) = min(1, 1) = 1 at t' = 10.
        assert_eq!(robustness.value_at(0.0), Ok(1.0));
    }

    #[test]
    fn until_zero_unbounded_interval_matches_plain() {
        let a = Signal::try_new([2.0, 0.5, 1.5], [0.0, 5.0, 10.0]).unwrap();
        let b = Signal::try_new([-1.0, 2.0, -0.5], [0.0, 5.0, 10.0]).unwrap();
        let trace = Trace::from([("a", a), ("b", b)]);

        let plain = Formula::until(
            Predicate::new("a").gt(0.0).into(),
            Predicate::new("b").gt(0.0).into(),
        );
        let explicit = Formula::until_within(
            0.0..,
            Predicate::new("a").gt(0.0).into(),
            Predicate::new("b").gt(0.0).into(),
        );

        assert_eq!(
            compute_robustness(&plain, &trace).unwrap(),
            compute_robustness(&explicit, &trace).unwrap()
        );
    }

    #[test]
    fn scalar_evaluation_reads_earliest_time() {
        let trace = trace_with("speed", &[30.0, 50.0], &[0.0, 10.0]);
        let phi = Formula::always(Predicate::new("speed").le(55.0).into());

        assert_eq!(evaluate(&phi, &trace), Ok(5.0));
    }
}
