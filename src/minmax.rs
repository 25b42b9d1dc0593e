//! Exact extremum envelopes of piecewise-linear signals.
//!
//! The combining steps of the robustness semantics are all extremum
//! computations: conjunction and disjunction take pointwise extrema of two
//! signals, while the temporal operators take extrema of one signal over
//! suffixes or sliding windows of its domain. The breakpoints of these
//! envelopes are not the breakpoints of the inputs: a pointwise minimum gains
//! a breakpoint wherever the operands cross, and a windowed infimum gains
//! breakpoints wherever a local minimum enters or leaves the window. The
//! functions in this module insert those breakpoints explicitly so that every
//! result is the exact envelope, not a sampling of it.
//!
//! Pairwise envelopes expect synchronized inputs (see
//! [`synchronize`](crate::synchronize)); windowed envelopes operate on a
//! single signal.

use std::collections::VecDeque;

use ordered_float::NotNan;

use crate::signal::{lerp, Sample, Signal};

/// Ordering half of an extremum computation.
///
/// `beats(a, b)` holds when `a` is at least as extreme as `b`, and `pick`
/// selects the more extreme of two values.
#[derive(Clone, Copy)]
pub(crate) enum Extremum {
    Min,
    Max,
}

impl Extremum {
    fn beats(self, a: f64, b: f64) -> bool {
        match self {
            Self::Min => a <= b,
            Self::Max => a >= b,
        }
    }

    fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Min => a.min(b),
            Self::Max => a.max(b),
        }
    }
}

/// Time at which two co-linear segments with value differences `d1` at `t1`
/// and `d2` at `t2` intersect. Callers must ensure the differences are finite
/// and strictly straddle zero.
pub(crate) fn crossing_time(t1: f64, t2: f64, d1: f64, d2: f64) -> f64 {
    t1 + d1 * (t2 - t1) / (d1 - d2)
}

pub(crate) fn straddles(d1: f64, d2: f64) -> bool {
    d1.is_finite() && d2.is_finite() && ((d1 < 0.0 && d2 > 0.0) || (d1 > 0.0 && d2 < 0.0))
}

fn push_monotonic(samples: &mut Vec<Sample>, sample: Sample) {
    match samples.last() {
        Some(last) if sample.time <= last.time => {}
        _ => samples.push(sample),
    }
}

/// Pointwise extremum of two synchronized signals, with a breakpoint inserted
/// at every time the operands cross.
pub(crate) fn extremum_pair(a: &Signal, b: &Signal, extremum: Extremum) -> Signal {
    debug_assert_eq!(a.len(), b.len());

    let mut samples = Vec::with_capacity(2 * a.len());
    let mut prev: Option<(Sample, Sample)> = None;

    for (&sa, &sb) in a.iter().zip(b.iter()) {
        if let Some((pa, pb)) = prev {
            let d1 = pa.value - pb.value;
            let d2 = sa.value - sb.value;

            if straddles(d1, d2) {
                let time = crossing_time(pa.time, sa.time, d1, d2);

                if time > pa.time && time < sa.time {
                    push_monotonic(&mut samples, Sample::new(time, lerp(&pa, &sa, time)));
                }
            }
        }

        push_monotonic(&mut samples, Sample::new(sa.time, extremum.pick(sa.value, sb.value)));
        prev = Some((sa, sb));
    }

    Signal::from_samples_unchecked(samples).simplify()
}

pub(crate) fn min_pair(a: &Signal, b: &Signal) -> Signal {
    extremum_pair(a, b, Extremum::Min)
}

pub(crate) fn max_pair(a: &Signal, b: &Signal) -> Signal {
    extremum_pair(a, b, Extremum::Max)
}

/// Refine two synchronized signals with breakpoints at every time they cross,
/// so that their pointwise extremum is linear on every segment of the shared
/// partition.
pub(crate) fn refine_crossings(a: &Signal, b: &Signal) -> (Signal, Signal) {
    debug_assert_eq!(a.len(), b.len());

    let mut ra = Vec::with_capacity(2 * a.len());
    let mut rb = Vec::with_capacity(2 * b.len());
    let mut prev: Option<(Sample, Sample)> = None;

    for (&sa, &sb) in a.iter().zip(b.iter()) {
        if let Some((pa, pb)) = prev {
            let d1 = pa.value - pb.value;
            let d2 = sa.value - sb.value;

            if straddles(d1, d2) {
                let time = crossing_time(pa.time, sa.time, d1, d2);

                if time > pa.time && time < sa.time {
                    let value = lerp(&pa, &sa, time);
                    push_monotonic(&mut ra, Sample::new(time, value));
                    push_monotonic(&mut rb, Sample::new(time, value));
                }
            }
        }

        push_monotonic(&mut ra, sa);
        push_monotonic(&mut rb, sb);
        prev = Some((sa, sb));
    }

    (
        Signal::from_samples_unchecked(ra),
        Signal::from_samples_unchecked(rb),
    )
}

/// Suffix envelope `t ↦ extremum of the signal over [t, end]`.
///
/// The scan runs right to left carrying the extremum seen so far, inserting a
/// breakpoint wherever a segment crosses the carried level: past that point
/// the envelope flattens instead of following the signal.
pub(crate) fn running_extremum(signal: &Signal, extremum: Extremum) -> Signal {
    let samples = signal.samples();
    let last = samples[samples.len() - 1];

    let mut level = last.value;
    let mut out = Vec::with_capacity(2 * samples.len());
    out.push(last);

    for pair in samples.windows(2).rev() {
        let (left, right) = (pair[0], pair[1]);

        if extremum.beats(left.value, level) && left.value != level {
            // The segment dips past the carried level; the envelope follows
            // the signal from the crossing leftward.
            let d1 = left.value - level;
            let d2 = right.value - level;

            if straddles(d1, d2) {
                let time = crossing_time(left.time, right.time, d1, d2);

                if time > left.time && time < right.time {
                    out.push(Sample::new(time, level));
                }
            }

            level = left.value;
            out.push(left);
        } else {
            out.push(Sample::new(left.time, level));
        }
    }

    out.reverse();
    Signal::from_samples_unchecked(out).simplify()
}

/// Sliding-window envelope `t ↦ extremum of the signal over
/// [t, min(t + width, end)]`, with the window clipped at the right edge of
/// the domain.
///
/// The envelope over a closed window is the extremum of three terms: the
/// value at the left window edge, the value at the (clipped) right window
/// edge, and the extremum over the breakpoints inside the window. The sweep
/// visits the refined partition {breakpoints} ∪ {breakpoints − width}, on
/// which each term is linear per segment and the interior-breakpoint term is
/// constant; that term is maintained with a monotonic wedge in the manner of
/// a streaming window minimum. Per segment, the three linear pieces are
/// combined exactly, emitting their pairwise crossings.
pub(crate) fn window_extremum(signal: &Signal, width: f64, extremum: Extremum) -> Signal {
    debug_assert!(width > 0.0);

    let begin = signal.begin_time();
    let end = signal.end_time();

    if width >= end - begin {
        // Every window reaches the end of the domain.
        return running_extremum(signal, extremum);
    }

    let partition = window_partition(signal, width);
    let samples = signal.samples();

    // Monotonic wedge over breakpoints, keyed by breakpoint time, holding
    // candidate extrema for the interior term.
    let mut wedge: VecDeque<Sample> = VecDeque::new();
    let mut admitted = 0;
    let mut out: Vec<Sample> = Vec::with_capacity(2 * partition.len());

    for pair in partition.windows(2) {
        let (p, q) = (pair[0], pair[1]);

        // Admit breakpoints whose activity interval [time − width, time]
        // covers this segment.
        while admitted < samples.len() && samples[admitted].time <= p + width {
            let sample = samples[admitted];

            while let Some(back) = wedge.back() {
                if extremum.beats(sample.value, back.value) {
                    wedge.pop_back();
                } else {
                    break;
                }
            }

            wedge.push_back(sample);
            admitted += 1;
        }

        // Expire breakpoints behind the left window edge.
        while let Some(front) = wedge.front() {
            if front.time < q {
                wedge.pop_front();
            } else {
                break;
            }
        }

        let interior = wedge.front().map(|sample| sample.value);
        let left_edge = (signal.eval(p), signal.eval(q));
        let right_edge = (
            signal.eval((p + width).min(end)),
            signal.eval((q + width).min(end)),
        );

        emit_segment(&mut out, (p, q), left_edge, right_edge, interior, extremum);
    }

    let final_time = partition[partition.len() - 1];
    let final_value = extremum.pick(
        signal.eval(final_time),
        signal.eval((final_time + width).min(end)),
    );

    push_monotonic(&mut out, Sample::new(final_time, final_value));
    Signal::from_samples_unchecked(out).simplify()
}

/// Sorted, deduplicated sweep times: every breakpoint together with every
/// breakpoint pulled back by the window width, clipped to the domain.
fn window_partition(signal: &Signal, width: f64) -> Vec<f64> {
    let begin = signal.begin_time();
    let end = signal.end_time();

    let mut times: Vec<NotNan<f64>> = Vec::with_capacity(2 * signal.len());

    for time in signal.times() {
        times.push(time);

        let pulled = time.into_inner() - width;
        if pulled > begin && pulled < end {
            times.push(NotNan::new(pulled).expect("finite time minus finite width"));
        }
    }

    times.sort_unstable();
    times.dedup();
    times.into_iter().map(NotNan::into_inner).collect()
}

/// Emit the extremum envelope of two linear pieces and one constant over the
/// segment `[p, q)`, inserting samples at every pairwise crossing.
fn emit_segment(
    out: &mut Vec<Sample>,
    (p, q): (f64, f64),
    (a_p, a_q): (f64, f64),
    (b_p, b_q): (f64, f64),
    interior: Option<f64>,
    extremum: Extremum,
) {
    let mut times = vec![p];

    let mut crossings = |v_p: f64, v_q: f64, w_p: f64, w_q: f64| {
        let d1 = v_p - w_p;
        let d2 = v_q - w_q;

        if straddles(d1, d2) {
            let time = crossing_time(p, q, d1, d2);

            if time > p && time < q {
                times.push(time);
            }
        }
    };

    crossings(a_p, a_q, b_p, b_q);

    if let Some(c) = interior {
        crossings(a_p, a_q, c, c);
        crossings(b_p, b_q, c, c);
    }

    times.sort_unstable_by(|a, b| a.partial_cmp(b).expect("segment times are never NaN"));

    let at = |v_p: f64, v_q: f64, time: f64| {
        lerp(&Sample::new(p, v_p), &Sample::new(q, v_q), time)
    };

    for time in times {
        let mut value = extremum.pick(at(a_p, a_q, time), at(b_p, b_q, time));

        if let Some(c) = interior {
            value = extremum.pick(value, c);
        }

        push_monotonic(out, Sample::new(time, value));
    }
}
