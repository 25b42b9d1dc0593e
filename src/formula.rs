//! Syntax trees for Signal Temporal Logic formulas.
//!
//! A [`Formula`] is an immutable tree of STL syntax nodes: atomic
//! propositions ([`Predicate`], [`Const`](Formula::Const)), propositional
//! connectives (`Not`, n-ary `And`/`Or`) and temporal modalities (`Always`,
//! `Eventually`, `Until`), the latter optionally bounded by an [`Interval`].
//! Formulas are built once through the constructor methods below, never
//! mutated, and can be shared and reused across any number of traces.
//!
//! # Examples
//!
//! The requirement "whenever `a` exceeds zero, `b` drops below zero within 5
//! time units" is expressed as:
//!
//! ```rust
//! use fleance::{Formula, Predicate};
//!
//! let trigger = Predicate::new("a").gt(0.0);
//! let response = Predicate::new("b").lt(0.0);
//!
//! let phi = Formula::always(Formula::or(
//!     Formula::negation(trigger.into()),
//!     Formula::eventually_within(0.0..=5.0, response.into()),
//! ));
//! ```

use std::fmt::{Display, Formatter};
use std::ops::{RangeFrom, RangeInclusive};

use nonempty::{nonempty, NonEmpty};

/// Comparison operator of an atomic proposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    #[default]
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Display for Comparison {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
        };

        write!(f, "{}", symbol)
    }
}

/// Atomic proposition comparing a named signal against a constant threshold.
///
/// A predicate starts out as `name > 0` and is bound to its final comparison
/// and threshold with one of the comparator methods:
///
/// ```rust
/// use fleance::Predicate;
///
/// let p = Predicate::new("rpm").le(4000.0);
///
/// assert_eq!(p.threshold(), 4000.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    name: String,
    comparison: Comparison,
    threshold: f64,
}

impl Predicate {
    /// Create a predicate over the named signal, initially `name > 0`.
    pub fn new<N>(name: N) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            comparison: Comparison::default(),
            threshold: 0.0,
        }
    }

    /// Bind the predicate to `name > threshold`.
    pub fn gt(self, threshold: f64) -> Self {
        self.bind(Comparison::Gt, threshold)
    }

    /// Bind the predicate to `name >= threshold`.
    pub fn ge(self, threshold: f64) -> Self {
        self.bind(Comparison::Ge, threshold)
    }

    /// Bind the predicate to `name < threshold`.
    pub fn lt(self, threshold: f64) -> Self {
        self.bind(Comparison::Lt, threshold)
    }

    /// Bind the predicate to `name <= threshold`.
    pub fn le(self, threshold: f64) -> Self {
        self.bind(Comparison::Le, threshold)
    }

    /// Bind the predicate to `name == threshold`.
    pub fn eq(self, threshold: f64) -> Self {
        self.bind(Comparison::Eq, threshold)
    }

    /// Bind the predicate to `name != threshold`.
    pub fn ne(self, threshold: f64) -> Self {
        self.bind(Comparison::Ne, threshold)
    }

    fn bind(mut self, comparison: Comparison, threshold: f64) -> Self {
        self.comparison = comparison;
        self.threshold = threshold;
        self
    }

    /// Name of the signal the predicate constrains.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Comparison operator of the predicate.
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Threshold the signal is compared against.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.name, self.comparison, self.threshold)
    }
}

/// Closed time interval `[lower, upper]` bounding a temporal operator,
/// relative to the evaluation time. A missing upper endpoint denotes an
/// unbounded future.
///
/// Intervals can be constructed explicitly or converted from range syntax:
///
/// ```rust
/// use fleance::Interval;
///
/// let bounded = Interval::from(0.0..=3.0);
/// let unbounded = Interval::from(1.0..);
///
/// assert_eq!(bounded.upper(), Some(3.0));
/// assert_eq!(unbounded.upper(), None);
/// ```
///
/// Interval bounds are validated during evaluation, where `lower < 0`,
/// `lower > upper`, or a NaN endpoint is reported as an
/// [`InvalidInterval`](crate::EvaluationError::InvalidInterval) error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lower: f64,
    upper: Option<f64>,
}

impl Interval {
    /// Create the bounded interval `[lower, upper]`.
    pub fn bounded(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    /// Create the unbounded interval `[lower, ∞)`.
    pub fn unbounded_from(lower: f64) -> Self {
        Self { lower, upper: None }
    }

    /// Lower endpoint of the interval.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Upper endpoint of the interval, or [`None`] when the interval extends
    /// to an unbounded future. An infinite upper endpoint is normalized to
    /// the unbounded representation.
    pub fn upper(&self) -> Option<f64> {
        self.upper
            .filter(|upper| !(upper.is_infinite() && upper.is_sign_positive()))
    }
}

impl From<RangeInclusive<f64>> for Interval {
    fn from(range: RangeInclusive<f64>) -> Self {
        let (lower, upper) = range.into_inner();
        Self::bounded(lower, upper)
    }
}

impl From<RangeFrom<f64>> for Interval {
    fn from(range: RangeFrom<f64>) -> Self {
        Self::unbounded_from(range.start)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.upper() {
            Some(upper) => write!(f, "[{},{}]", self.lower, upper),
            None => write!(f, "[{},inf)", self.lower),
        }
    }
}

/// An immutable Signal Temporal Logic syntax tree.
///
/// See the [module-level documentation](self) for more information about
/// constructing and evaluating formulas.
#[derive(Debug, Clone, PartialEq)]
pub enum Formula {
    /// Boolean constant, evaluating to ±∞ robustness over the trace hull.
    Const(bool),

    /// Atomic proposition over a named signal.
    Predicate(Predicate),

    /// Logical negation.
    Not(Box<Formula>),

    /// N-ary conjunction of at least two operands.
    And(Box<NonEmpty<Formula>>),

    /// N-ary disjunction of at least two operands.
    Or(Box<NonEmpty<Formula>>),

    /// The subformula must hold at every time of the window. An absent
    /// interval denotes `[0, ∞)`.
    Always {
        subformula: Box<Formula>,
        interval: Option<Interval>,
    },

    /// The subformula must hold at some time of the window. An absent
    /// interval denotes `[0, ∞)`.
    Eventually {
        subformula: Box<Formula>,
        interval: Option<Interval>,
    },

    /// The right subformula must hold at some time of the window, with the
    /// left subformula holding at every time up to that point. An absent
    /// interval denotes `[0, ∞)`.
    Until {
        left: Box<Formula>,
        right: Box<Formula>,
        interval: Option<Interval>,
    },
}

impl Formula {
    /// Negate a formula.
    ///
    /// Negating a constant folds it, and a double negation collapses to the
    /// inner formula.
    pub fn negation(formula: Formula) -> Self {
        match formula {
            Self::Const(value) => Self::Const(!value),
            Self::Not(inner) => *inner,
            other => Self::Not(Box::new(other)),
        }
    }

    /// Conjunction of one or more operands.
    ///
    /// Operands that are themselves conjunctions are flattened into the new
    /// node, and a conjunction of a single operand collapses to that operand.
    pub fn conjunction(operands: NonEmpty<Formula>) -> Self {
        Self::nary(operands, NaryKind::And)
    }

    /// Disjunction of one or more operands.
    ///
    /// Operands that are themselves disjunctions are flattened into the new
    /// node, and a disjunction of a single operand collapses to that operand.
    pub fn disjunction(operands: NonEmpty<Formula>) -> Self {
        Self::nary(operands, NaryKind::Or)
    }

    /// Binary conjunction.
    pub fn and(left: Formula, right: Formula) -> Self {
        Self::conjunction(nonempty![left, right])
    }

    /// Binary disjunction.
    pub fn or(left: Formula, right: Formula) -> Self {
        Self::disjunction(nonempty![left, right])
    }

    /// The subformula must hold at every future time.
    pub fn always(subformula: Formula) -> Self {
        Self::Always {
            subformula: Box::new(subformula),
            interval: None,
        }
    }

    /// The subformula must hold at every time within the interval.
    pub fn always_within<I>(interval: I, subformula: Formula) -> Self
    where
        I: Into<Interval>,
    {
        Self::Always {
            subformula: Box::new(subformula),
            interval: Some(interval.into()),
        }
    }

    /// The subformula must hold at some future time.
    pub fn eventually(subformula: Formula) -> Self {
        Self::Eventually {
            subformula: Box::new(subformula),
            interval: None,
        }
    }

    /// The subformula must hold at some time within the interval.
    pub fn eventually_within<I>(interval: I, subformula: Formula) -> Self
    where
        I: Into<Interval>,
    {
        Self::Eventually {
            subformula: Box::new(subformula),
            interval: Some(interval.into()),
        }
    }

    /// The right subformula must hold at some future time, with the left
    /// subformula holding until then.
    pub fn until(left: Formula, right: Formula) -> Self {
        Self::Until {
            left: Box::new(left),
            right: Box::new(right),
            interval: None,
        }
    }

    /// The right subformula must hold at some time within the interval, with
    /// the left subformula holding until then.
    pub fn until_within<I>(interval: I, left: Formula, right: Formula) -> Self
    where
        I: Into<Interval>,
    {
        Self::Until {
            left: Box::new(left),
            right: Box::new(right),
            interval: Some(interval.into()),
        }
    }

    fn nary(operands: NonEmpty<Formula>, kind: NaryKind) -> Self {
        let NonEmpty { head, tail } = operands;
        let mut flattened: Vec<Formula> = Vec::with_capacity(tail.len() + 1);

        for operand in std::iter::once(head).chain(tail) {
            match (kind, operand) {
                (NaryKind::And, Formula::And(inner)) => flattened.extend(*inner),
                (NaryKind::Or, Formula::Or(inner)) => flattened.extend(*inner),
                (_, other) => flattened.push(other),
            }
        }

        let mut iter = flattened.into_iter();
        let head = iter
            .next()
            .expect("flattening a non-empty operand list yields at least one operand");
        let tail: Vec<Formula> = iter.collect();

        if tail.is_empty() {
            head
        } else {
            let operands = NonEmpty { head, tail };

            match kind {
                NaryKind::And => Self::And(Box::new(operands)),
                NaryKind::Or => Self::Or(Box::new(operands)),
            }
        }
    }
}

#[derive(Clone, Copy)]
enum NaryKind {
    And,
    Or,
}

impl From<bool> for Formula {
    fn from(value: bool) -> Self {
        Self::Const(value)
    }
}

impl From<Predicate> for Formula {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(predicate)
    }
}

fn write_operands(
    f: &mut Formatter<'_>,
    operands: &NonEmpty<Formula>,
    separator: &str,
) -> std::fmt::Result {
    write!(f, "(")?;

    for (index, operand) in operands.iter().enumerate() {
        if index != 0 {
            write!(f, " {} ", separator)?;
        }

        write!(f, "{}", operand)?;
    }

    write!(f, ")")
}

impl Display for Formula {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Const(value) => write!(f, "{}", value),
            Self::Predicate(predicate) => write!(f, "{}", predicate),
            Self::Not(subformula) => write!(f, "~{}", subformula),
            Self::And(operands) => write_operands(f, operands, "&"),
            Self::Or(operands) => write_operands(f, operands, "|"),
            Self::Always {
                subformula,
                interval,
            } => match interval {
                Some(interval) => write!(f, "G{} {}", interval, subformula),
                None => write!(f, "G {}", subformula),
            },
            Self::Eventually {
                subformula,
                interval,
            } => match interval {
                Some(interval) => write!(f, "F{} {}", interval, subformula),
                None => write!(f, "F {}", subformula),
            },
            Self::Until {
                left,
                right,
                interval,
            } => match interval {
                Some(interval) => write!(f, "{} U{} {}", left, interval, right),
                None => write!(f, "{} U {}", left, right),
            },
        }
    }
}
