//! Piecewise-linear, continuous-time signals.
//!
//! A [`Signal`] represents a single real-valued function of time as an ordered
//! sequence of [`Sample`] breakpoints with linear interpolation between
//! consecutive breakpoints. Signals are the input to a robustness computation
//! (as entries in a [`Trace`](crate::Trace)) as well as its output, which makes
//! the invariants of this type load-bearing for the whole crate: a signal
//! always contains at least one sample, its sample times are finite and
//! strictly increasing, and its values are never NaN.
//!
//! # Safety
//!
//! `f64` times do not inherently support a total order due to the presence of
//! NaN values. To work around this issue, construction rejects NaN (and
//! infinite) times with an [`InvalidSignal`] error, which allows every
//! other operation in the crate to order times with [`NotNan`] keys without
//! panicking.
//!
//! # Examples
//!
//! A `Signal` is constructed from parallel sequences of values and times:
//!
//! ```rust
//! use fleance::Signal;
//!
//! let signal = Signal::try_new([1.0, -1.0], [0.0, 1.0])?;
//!
//! assert_eq!(signal.begin_time(), 0.0);
//! assert_eq!(signal.end_time(), 1.0);
//! # Ok::<(), fleance::InvalidSignal>(())
//! ```
//!
//! Values between breakpoints are linearly interpolated, and queries outside
//! of the signal domain are rejected:
//!
//! ```rust
//! use fleance::Signal;
//!
//! let signal = Signal::try_new([1.0, -1.0], [0.0, 1.0])?;
//!
//! assert_eq!(signal.value_at(0.5), Ok(0.0));
//! assert!(signal.value_at(2.0).is_err());
//! # Ok::<(), fleance::InvalidSignal>(())
//! ```

use ordered_float::NotNan;
use thiserror::Error;

/// A single breakpoint of a piecewise-linear signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub value: f64,
}

impl Sample {
    pub fn new(time: f64, value: f64) -> Self {
        Self { time, value }
    }
}

impl From<(f64, f64)> for Sample {
    fn from((time, value): (f64, f64)) -> Self {
        Self { time, value }
    }
}

/// Linear interpolation along the segment from `a` to `b`, clamped to the
/// segment endpoints.
///
/// The equal-value case is short-circuited so that constant segments holding
/// an infinite value (produced when evaluating a `Const` formula) do not
/// generate NaN through `inf - inf`.
pub(crate) fn lerp(a: &Sample, b: &Sample, time: f64) -> f64 {
    if a.value == b.value || time <= a.time {
        a.value
    } else if time >= b.time {
        b.value
    } else {
        a.value + (b.value - a.value) * (time - a.time) / (b.time - a.time)
    }
}

/// The error type for signal construction.
///
/// Each variant corresponds to one of the signal invariants: parallel value
/// and time sequences, at least one sample, finite times, NaN-free values,
/// and strictly increasing times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum InvalidSignal {
    #[error("number of values ({values}) does not match number of times ({times})")]
    LengthMismatch { values: usize, times: usize },

    #[error("a signal must contain at least one sample")]
    Empty,

    #[error("sample time at index {index} is NaN or infinite")]
    NonFiniteTime { index: usize },

    #[error("sample value at index {index} is NaN")]
    NanValue { index: usize },

    #[error("sample times must be strictly increasing, violated at index {index}")]
    NonMonotonicTime { index: usize },
}

/// The error type for value queries outside of a signal domain.
///
/// This crate uses a strict domain policy: a signal is undefined before its
/// first sample and after its last, and no hold or extrapolation value is
/// ever substituted.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("time {time} is outside of the signal domain [{begin}, {end}]")]
pub struct OutOfDomain {
    pub time: f64,
    pub begin: f64,
    pub end: f64,
}

/// A piecewise-linear, continuous-time signal.
///
/// See the [module-level documentation](self) for the invariants and the
/// interpolation semantics of this type.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<Sample>,
}

impl Signal {
    /// Create a signal from parallel sequences of values and times.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidSignal`] error if the sequences have different
    /// lengths or are empty, if any time is NaN or infinite, if any value is
    /// NaN, or if the times are not strictly increasing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fleance::Signal;
    ///
    /// let signal = Signal::try_new([0.0, 2.0, 1.0], [0.0, 2.5, 4.5])?;
    /// assert_eq!(signal.len(), 3);
    ///
    /// assert!(Signal::try_new([1.0, 2.0], [0.0, 0.0]).is_err());
    /// # Ok::<(), fleance::InvalidSignal>(())
    /// ```
    pub fn try_new<V, T>(values: V, times: T) -> Result<Self, InvalidSignal>
    where
        V: IntoIterator<Item = f64>,
        T: IntoIterator<Item = f64>,
    {
        let values: Vec<f64> = values.into_iter().collect();
        let times: Vec<f64> = times.into_iter().collect();

        if values.len() != times.len() {
            return Err(InvalidSignal::LengthMismatch {
                values: values.len(),
                times: times.len(),
            });
        }

        let samples = times
            .into_iter()
            .zip(values)
            .map(|(time, value)| Sample { time, value })
            .collect();

        Self::from_samples(samples)
    }

    /// Create a signal from a sequence of samples, validating the signal
    /// invariants.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self, InvalidSignal> {
        if samples.is_empty() {
            return Err(InvalidSignal::Empty);
        }

        for (index, sample) in samples.iter().enumerate() {
            if !sample.time.is_finite() {
                return Err(InvalidSignal::NonFiniteTime { index });
            }

            if sample.value.is_nan() {
                return Err(InvalidSignal::NanValue { index });
            }

            if index > 0 && sample.time <= samples[index - 1].time {
                return Err(InvalidSignal::NonMonotonicTime { index });
            }
        }

        Ok(Self { samples })
    }

    /// Create a signal holding a single value over the domain `[begin, end]`.
    ///
    /// A degenerate domain with `begin == end` produces a single-sample
    /// signal.
    pub fn constant(begin: f64, end: f64, value: f64) -> Result<Self, InvalidSignal> {
        let samples = if begin == end {
            vec![Sample { time: begin, value }]
        } else {
            vec![Sample { time: begin, value }, Sample { time: end, value }]
        };

        Self::from_samples(samples)
    }

    /// Create a signal from samples produced by an evaluation step.
    ///
    /// The caller is responsible for upholding the signal invariants, which
    /// every internal producer does by construction.
    pub(crate) fn from_samples_unchecked(samples: Vec<Sample>) -> Self {
        debug_assert!(!samples.is_empty());
        debug_assert!(samples.windows(2).all(|w| w[0].time < w[1].time));

        Self { samples }
    }

    /// The time of the first sample.
    pub fn begin_time(&self) -> f64 {
        self.samples[0].time
    }

    /// The time of the last sample.
    pub fn end_time(&self) -> f64 {
        self.samples[self.samples.len() - 1].time
    }

    /// Number of breakpoints in the signal.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// A signal always contains at least one sample, so this method only
    /// exists to satisfy the convention that `len` is paired with `is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The breakpoints of the signal in chronological order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterate over the breakpoints of the signal in chronological order.
    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Compute the value of the signal at the given time using linear
    /// interpolation between the bracketing breakpoints.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfDomain`] if the time lies outside of
    /// `[begin_time, end_time]` or is NaN.
    pub fn value_at(&self, time: f64) -> Result<f64, OutOfDomain> {
        if !(time >= self.begin_time() && time <= self.end_time()) {
            return Err(OutOfDomain {
                time,
                begin: self.begin_time(),
                end: self.end_time(),
            });
        }

        Ok(self.eval(time))
    }

    /// Interpolated value at a time known to be inside the domain.
    pub(crate) fn eval(&self, time: f64) -> f64 {
        debug_assert!(time >= self.begin_time() && time <= self.end_time());

        let index = match self
            .samples
            .binary_search_by(|s| s.time.partial_cmp(&time).unwrap())
        {
            Ok(exact) => return self.samples[exact].value,
            Err(index) => index,
        };

        lerp(&self.samples[index - 1], &self.samples[index], time)
    }

    /// Translate the time axis of the signal by `dt`.
    pub(crate) fn shift(&self, dt: f64) -> Self {
        let samples = self
            .samples
            .iter()
            .map(|s| Sample::new(s.time + dt, s.value))
            .collect();

        Self::from_samples_unchecked(samples)
    }

    /// Restrict the signal to the sub-domain `[start, end]`, interpolating
    /// new boundary samples where the cut falls inside a segment.
    ///
    /// Returns [`None`] when the requested range does not intersect the
    /// signal domain.
    pub(crate) fn truncated(&self, start: f64, end: f64) -> Option<Self> {
        let start = start.max(self.begin_time());
        let end = end.min(self.end_time());

        if start > end {
            return None;
        }

        let mut samples = Vec::with_capacity(self.samples.len());

        if self.samples.iter().all(|s| s.time < start || s.time > end) {
            // The cut falls strictly inside one segment.
            samples.push(Sample::new(start, self.eval(start)));
            if end > start {
                samples.push(Sample::new(end, self.eval(end)));
            }

            return Some(Self::from_samples_unchecked(samples));
        }

        for sample in &self.samples {
            if sample.time < start || sample.time > end {
                continue;
            }

            if samples.is_empty() && sample.time > start {
                samples.push(Sample::new(start, self.eval(start)));
            }

            samples.push(*sample);
        }

        let last = samples[samples.len() - 1];
        if last.time < end {
            samples.push(Sample::new(end, self.eval(end)));
        }

        Some(Self::from_samples_unchecked(samples))
    }

    /// Remove breakpoints that are collinear with their neighbours.
    ///
    /// Collinearity is checked exactly, so simplification never changes the
    /// function represented by the signal.
    pub(crate) fn simplify(self) -> Self {
        if self.samples.len() < 3 {
            return self;
        }

        let mut samples: Vec<Sample> = Vec::with_capacity(self.samples.len());

        for sample in self.samples {
            while samples.len() >= 2 {
                let prev = samples[samples.len() - 1];
                let first = samples[samples.len() - 2];

                if redundant(&first, &prev, &sample) {
                    samples.pop();
                } else {
                    break;
                }
            }

            samples.push(sample);
        }

        Self::from_samples_unchecked(samples)
    }

    /// Times of the signal breakpoints as a totally ordered sequence.
    pub(crate) fn times(&self) -> impl Iterator<Item = NotNan<f64>> + '_ {
        self.samples
            .iter()
            .map(|s| NotNan::new(s.time).expect("signal times are never NaN"))
    }
}

/// A middle sample is redundant when it lies exactly on the line between its
/// neighbours. Constant runs are matched by value so that infinite values do
/// not produce NaN in the collinearity product.
fn redundant(first: &Sample, middle: &Sample, last: &Sample) -> bool {
    if first.value == middle.value && middle.value == last.value {
        return true;
    }

    let lhs = (middle.value - first.value) * (last.time - first.time);
    let rhs = (last.value - first.value) * (middle.time - first.time);

    lhs == rhs
}

impl<'a> IntoIterator for &'a Signal {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
