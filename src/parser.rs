//! Concrete syntax for formulas.
//!
//! This module provides a parser for a textual representation of STL
//! formulas, which is useful for reading requirements from configuration
//! rather than building them in code. The grammar accepts:
//!
//!   - predicates `name op number` with `op` one of `>`, `>=`, `<`, `<=`,
//!     `==`, `!=`
//!   - the constants `true` and `false`
//!   - negation written `!`, `~`, or `not`
//!   - conjunction written `/\`, `&`, or `and`
//!   - disjunction written `\/`, `|`, or `or`
//!   - implication written `->` or `implies`, desugared into `~lhs \/ rhs`
//!   - `always` (`G`, `[]`), `eventually` (`F`, `<>`), and `until` (`U`),
//!     each with an optional window `{lower,upper}` where `upper` may be
//!     `inf`
//!   - parenthesized subformulas
//!
//! # Examples
//!
//! ```rust
//! use fleance::parse_formula;
//!
//! let phi = parse_formula(r"G{0,10} (speed <= 50.0 /\ rpm < 4000.0)")?;
//! let psi = parse_formula("gear == 3.0 -> F{0,3} gear == 4.0")?;
//! # Ok::<(), fleance::ParseError>(())
//! ```

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{alpha1, digit0, digit1, space0, space1};
use nom::combinator::{map, map_res, opt, recognize};
use nom::sequence::{delimited, pair, preceded, terminated, tuple};
use nom::IResult;
use thiserror::Error;

use crate::formula::{Comparison, Formula, Interval, Predicate};

/// The error type for parsing a formula from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("could not parse formula: {0}")]
    Syntax(String),

    #[error("parsing did not consume the entire input, remaining: \"{0}\"")]
    IncompleteParse(String),
}

/// Parse a formula from its concrete syntax.
///
/// The entire input must be consumed; trailing characters produce a
/// [`ParseError::IncompleteParse`] error.
pub fn parse_formula(input: &str) -> Result<Formula, ParseError> {
    let (rest, parsed) = delimited(space0, formula, space0)(input)
        .map_err(|err| ParseError::Syntax(err.to_string()))?;

    if rest.is_empty() {
        Ok(parsed)
    } else {
        Err(ParseError::IncompleteParse(rest.to_string()))
    }
}

fn var_name(input: &str) -> IResult<&str, String> {
    let mut parser = pair(alpha1, digit0);
    let (rest, (s1, s2)) = parser(input)?;
    let name = s1.to_string() + s2;

    Ok((rest, name))
}

fn pos_num(input: &str) -> IResult<&str, f64> {
    let make_number = |(front, back): (&str, Option<&str>)| {
        let num_str = front.to_string() + back.unwrap_or("");
        f64::from_str(&num_str)
    };

    let back_parser = pair(tag("."), digit1);
    let num_parser = pair(digit1, opt(recognize(back_parser)));
    let mut parser = map_res(num_parser, make_number);

    parser(input)
}

fn pos_neg_num(input: &str) -> IResult<&str, f64> {
    let mut parser = pair(opt(tag("-")), pos_num);
    let (rest, (sign, num)) = parser(input)?;
    let signed_num = match sign {
        Some(_) => -num,
        None => num,
    };

    Ok((rest, signed_num))
}

fn comparison(input: &str) -> IResult<&str, Comparison> {
    let mut parser = alt((
        map(tag(">="), |_| Comparison::Ge),
        map(tag("<="), |_| Comparison::Le),
        map(tag("=="), |_| Comparison::Eq),
        map(tag("!="), |_| Comparison::Ne),
        map(tag(">"), |_| Comparison::Gt),
        map(tag("<"), |_| Comparison::Lt),
    ));

    parser(input)
}

fn predicate(input: &str) -> IResult<&str, Predicate> {
    let mut parser = tuple((var_name, delimited(space0, comparison, space0), pos_neg_num));
    let (rest, (name, comparison, threshold)) = parser(input)?;

    let predicate = Predicate::new(name);
    let predicate = match comparison {
        Comparison::Gt => predicate.gt(threshold),
        Comparison::Ge => predicate.ge(threshold),
        Comparison::Lt => predicate.lt(threshold),
        Comparison::Le => predicate.le(threshold),
        Comparison::Eq => predicate.eq(threshold),
        Comparison::Ne => predicate.ne(threshold),
    };

    Ok((rest, predicate))
}

fn constant(input: &str) -> IResult<&str, Formula> {
    let mut parser = alt((
        map(tag("true"), |_| Formula::Const(true)),
        map(tag("false"), |_| Formula::Const(false)),
    ));

    parser(input)
}

/// A window annotation `{lower,upper}`, where `upper` may be `inf`.
fn interval(input: &str) -> IResult<&str, Interval> {
    let upper = alt((map(tag("inf"), |_| None), map(pos_num, Some)));
    let mut parser = tuple((tag("{"), pos_num, tag(","), upper, tag("}")));
    let (rest, (_, lower, _, upper, _)) = parser(input)?;

    let interval = match upper {
        Some(upper) => Interval::bounded(lower, upper),
        None => Interval::unbounded_from(lower),
    };

    Ok((rest, interval))
}

fn subformula(input: &str) -> IResult<&str, Formula> {
    let inner = delimited(space0, formula, space0);
    let mut parser = delimited(tag("("), inner, tag(")"));

    parser(input)
}

/// An operand that ends before an infix operator symbol.
fn left_operand(input: &str) -> IResult<&str, Formula> {
    let p1 = terminated(map(predicate, Formula::from), space1);
    let p2 = terminated(constant, space1);
    let p3 = terminated(subformula, space0);
    let mut parser = alt((p1, p2, p3));

    parser(input)
}

/// An operand that follows a prefix or infix operator symbol.
fn right_operand(input: &str) -> IResult<&str, Formula> {
    let p1 = preceded(space1, map(predicate, Formula::from));
    let p2 = preceded(space1, constant);
    let p3 = preceded(space0, subformula);
    let mut parser = alt((p1, p2, p3));

    parser(input)
}

fn not(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag("!"), tag("~"), tag("not")));
    let mut parser = preceded(op, right_operand);
    let (rest, operand) = parser(input)?;

    Ok((rest, Formula::negation(operand)))
}

fn and(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag(r"/\"), tag("&"), tag("and")));
    let mut parser = pair(left_operand, preceded(op, right_operand));
    let (rest, (left, right)) = parser(input)?;

    Ok((rest, Formula::and(left, right)))
}

fn or(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag(r"\/"), tag("|"), tag("or")));
    let mut parser = pair(left_operand, preceded(op, right_operand));
    let (rest, (left, right)) = parser(input)?;

    Ok((rest, Formula::or(left, right)))
}

fn implies(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag("->"), tag("implies")));
    let mut parser = pair(left_operand, preceded(op, right_operand));
    let (rest, (left, right)) = parser(input)?;

    Ok((rest, Formula::or(Formula::negation(left), right)))
}

fn always(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag("always"), tag("[]"), tag("G")));
    let mut parser = pair(preceded(op, opt(interval)), right_operand);
    let (rest, (window, operand)) = parser(input)?;

    let formula = match window {
        Some(window) => Formula::always_within(window, operand),
        None => Formula::always(operand),
    };

    Ok((rest, formula))
}

fn eventually(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag("eventually"), tag("<>"), tag("F")));
    let mut parser = pair(preceded(op, opt(interval)), right_operand);
    let (rest, (window, operand)) = parser(input)?;

    let formula = match window {
        Some(window) => Formula::eventually_within(window, operand),
        None => Formula::eventually(operand),
    };

    Ok((rest, formula))
}

fn until(input: &str) -> IResult<&str, Formula> {
    let op = alt((tag("until"), tag("U")));
    let mut parser = tuple((left_operand, preceded(op, opt(interval)), right_operand));
    let (rest, (left, window, right)) = parser(input)?;

    let formula = match window {
        Some(window) => Formula::until_within(window, left, right),
        None => Formula::until(left, right),
    };

    Ok((rest, formula))
}

fn formula(input: &str) -> IResult<&str, Formula> {
    let mut parser = alt((
        always,
        eventually,
        not,
        and,
        or,
        implies,
        until,
        subformula,
        constant,
        map(predicate, Formula::from),
    ));

    parser(input)
}

#[cfg(test)]
mod tests {
    use super::{parse_formula, predicate, ParseError};
    use crate::formula::{Formula, Interval, Predicate};

    #[test]
    fn parse_predicate() {
        let (rest, parsed) = predicate("x1 >= -3.1").unwrap();

        assert_eq!(rest, "");
        assert_eq!(parsed, Predicate::new("x1").ge(-3.1));

        let (rest, parsed) = predicate("y<2").unwrap();

        assert_eq!(rest, "");
        assert_eq!(parsed, Predicate::new("y").lt(2.0));
    }

    #[test]
    fn parse_propositional() -> Result<(), ParseError> {
        let expected = Formula::and(
            Predicate::new("x").gt(0.0).into(),
            Predicate::new("y").le(4.0).into(),
        );

        assert_eq!(parse_formula(r"x > 0.0 /\ y <= 4.0")?, expected);
        assert_eq!(parse_formula("x > 0.0 and y <= 4.0")?, expected);
        assert_eq!(parse_formula(r"(x > 0.0) /\ (y <= 4.0)")?, expected);

        let negated = parse_formula("not x > 0.0")?;
        assert_eq!(
            negated,
            Formula::negation(Predicate::new("x").gt(0.0).into())
        );

        Ok(())
    }

    #[test]
    fn parse_implication_desugars() -> Result<(), ParseError> {
        let parsed = parse_formula("x > 0.0 -> y > 0.0")?;
        let expected = Formula::or(
            Formula::negation(Predicate::new("x").gt(0.0).into()),
            Predicate::new("y").gt(0.0).into(),
        );

        assert_eq!(parsed, expected);
        Ok(())
    }

    #[test]
    fn parse_temporal() -> Result<(), ParseError> {
        let bounded = parse_formula("G{0,10} x > 0.0")?;
        let expected = Formula::always_within(
            Interval::bounded(0.0, 10.0),
            Predicate::new("x").gt(0.0).into(),
        );

        assert_eq!(bounded, expected);

        let unbounded = parse_formula("eventually x > 0.0")?;
        assert_eq!(
            unbounded,
            Formula::eventually(Predicate::new("x").gt(0.0).into())
        );

        let infinite = parse_formula("<>{1,inf} x > 0.0")?;
        assert_eq!(
            infinite,
            Formula::eventually_within(
                Interval::unbounded_from(1.0),
                Predicate::new("x").gt(0.0).into()
            )
        );

        Ok(())
    }

    #[test]
    fn parse_until() -> Result<(), ParseError> {
        let plain = parse_formula("x > 0.0 U y <= 0.0")?;
        assert_eq!(
            plain,
            Formula::until(
                Predicate::new("x").gt(0.0).into(),
                Predicate::new("y").le(0.0).into(),
            )
        );

        let bounded = parse_formula("(x > 0.0) U{0,2.5} (y <= 0.0)")?;
        assert_eq!(
            bounded,
            Formula::until_within(
                Interval::bounded(0.0, 2.5),
                Predicate::new("x").gt(0.0).into(),
                Predicate::new("y").le(0.0).into(),
            )
        );

        Ok(())
    }

    #[test]
    fn parse_nested() -> Result<(), ParseError> {
        let parsed = parse_formula(r"[]{0,10} (x > 0.0 /\ (not y <= 2.0))")?;
        let expected = Formula::always_within(
            Interval::bounded(0.0, 10.0),
            Formula::and(
                Predicate::new("x").gt(0.0).into(),
                Formula::negation(Predicate::new("y").le(2.0).into()),
            ),
        );

        assert_eq!(parsed, expected);
        Ok(())
    }

    #[test]
    fn trailing_input() {
        assert!(matches!(
            parse_formula("x > 0.0 junk"),
            Err(ParseError::IncompleteParse(_))
        ));
    }
}
