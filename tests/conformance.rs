use std::error::Error;

use approx::assert_relative_eq;
use fleance::{compute_robustness, Formula, Predicate, Signal, Trace};

/// Trace with one wavy signal and one decaying signal, rich enough in
/// crossings to exercise envelope breakpoints.
fn fixture() -> Result<Trace, Box<dyn Error>> {
    let a = Signal::try_new(vec![0.0, 2.0, 1.0, -2.0, -1.0], vec![0.0, 2.5, 4.5, 6.5, 9.0])?;
    let b = Signal::try_new(vec![0.0, -2.0, 2.0, 1.0, -1.5], vec![0.0, 2.0, 6.0, 8.5, 9.0])?;

    Ok(Trace::from([("a", a), ("b", b)]))
}

fn p(name: &str) -> Formula {
    Predicate::new(name).gt(0.0).into()
}

/// Compare two robustness signals as functions: equal domains and equal
/// values on a dense grid over the shared domain.
fn assert_same_function(left: &Signal, right: &Signal) {
    assert_eq!(left.begin_time(), right.begin_time());
    assert_eq!(left.end_time(), right.end_time());

    let begin = left.begin_time();
    let span = left.end_time() - begin;

    for step in 0..=200 {
        let time = (begin + span * (step as f64) / 200.0).min(left.end_time());

        assert_relative_eq!(
            left.value_at(time).unwrap(),
            right.value_at(time).unwrap(),
            epsilon = 1e-9,
            max_relative = 1e-9
        );
    }
}

#[test]
fn double_negation() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    let plain = compute_robustness(&p("a"), &trace)?;
    let doubled = compute_robustness(
        &Formula::Not(Box::new(Formula::Not(Box::new(p("a"))))),
        &trace,
    )?;

    assert_same_function(&plain, &doubled);
    Ok(())
}

#[test]
fn conjunction_is_pointwise_minimum() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    let conjunction = compute_robustness(&Formula::and(p("a"), p("b")), &trace)?;
    let left = compute_robustness(&p("a"), &trace)?;
    let right = compute_robustness(&p("b"), &trace)?;

    let begin = conjunction.begin_time();
    let span = conjunction.end_time() - begin;

    for step in 0..=200 {
        let time = (begin + span * (step as f64) / 200.0).min(conjunction.end_time());
        let expected = f64::min(left.value_at(time)?, right.value_at(time)?);

        assert_relative_eq!(
            conjunction.value_at(time)?,
            expected,
            epsilon = 1e-9,
            max_relative = 1e-9
        );
    }

    Ok(())
}

#[test]
fn de_morgan() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    let disjunction = compute_robustness(&Formula::or(p("a"), p("b")), &trace)?;

    // ~(~a /\ ~b), built from raw nodes so no constructor folds the
    // negations away.
    let negated = Formula::Not(Box::new(Formula::and(
        Formula::Not(Box::new(p("a"))),
        Formula::Not(Box::new(p("b"))),
    )));
    let dual = compute_robustness(&negated, &trace)?;

    assert_same_function(&disjunction, &dual);
    Ok(())
}

#[test]
fn degenerate_always_window_is_identity() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    let plain = compute_robustness(&p("a"), &trace)?;
    let degenerate = compute_robustness(&Formula::always_within(0.0..=0.0, p("a")), &trace)?;

    assert_same_function(&plain, &degenerate);
    Ok(())
}

#[test]
fn covering_window_matches_unbounded_always() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    // The window [0, 100] reaches past the horizon at every time, so the
    // bounded evaluation clips to exactly the unbounded one.
    let bounded = compute_robustness(&Formula::always_within(0.0..=100.0, p("a")), &trace)?;
    let unbounded = compute_robustness(&Formula::always(p("a")), &trace)?;

    assert_same_function(&bounded, &unbounded);
    Ok(())
}

#[test]
fn eventually_is_dual_of_always() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    for phi in [
        Formula::eventually(p("a")),
        Formula::eventually_within(0.0..=3.0, p("a")),
        Formula::eventually_within(1.0..=4.0, p("a")),
    ] {
        let (subformula, interval) = match &phi {
            Formula::Eventually {
                subformula,
                interval,
            } => (subformula.clone(), *interval),
            _ => unreachable!(),
        };

        let negated_body = Formula::Not(subformula);
        let dual = Formula::Not(Box::new(match interval {
            Some(interval) => Formula::always_within(interval, negated_body),
            None => Formula::always(negated_body),
        }));

        let direct = compute_robustness(&phi, &trace)?;
        let via_dual = compute_robustness(&dual, &trace)?;

        assert_same_function(&direct, &via_dual);
    }

    Ok(())
}

#[test]
fn until_with_trivial_guard_matches_eventually() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    // true U phi has the same semantics as F phi. The until evaluation is
    // exact at every breakpoint of its output, so the comparison samples the
    // breakpoints of both results.
    let eventually = compute_robustness(&Formula::eventually(p("b")), &trace)?;
    let until = compute_robustness(&Formula::until(Formula::from(true), p("b")), &trace)?;

    assert_eq!(eventually.begin_time(), until.begin_time());
    assert_eq!(eventually.end_time(), until.end_time());

    for sample in until.iter() {
        assert_relative_eq!(
            eventually.value_at(sample.time)?,
            sample.value,
            epsilon = 1e-9,
            max_relative = 1e-9
        );
    }

    for sample in eventually.iter() {
        assert_relative_eq!(
            until.value_at(sample.time)?,
            sample.value,
            epsilon = 1e-9,
            max_relative = 1e-9
        );
    }

    Ok(())
}

#[test]
fn explicit_zero_interval_matches_plain_until() -> Result<(), Box<dyn Error>> {
    let trace = fixture()?;

    let plain = compute_robustness(&Formula::until(p("a"), p("b")), &trace)?;
    let explicit = compute_robustness(&Formula::until_within(0.0.., p("a"), p("b")), &trace)?;

    assert_same_function(&plain, &explicit);
    Ok(())
}
