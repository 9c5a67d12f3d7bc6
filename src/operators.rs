//! Relational, arithmetic and aggregate operators.
//!
//! Mirrors `aspy/program/operators.py` from the reference implementation:
//! `RelOp` distinguishes a side-flip (`neg`, used to move a guard from one
//! side of a comparison to the other while keeping its meaning) from a
//! logical inversion (`invert`, the negated relation).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Relational (comparison) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    Equal,
    Unequal,
    Less,
    Greater,
    LessOrEq,
    GreaterOrEq,
}

impl RelOp {
    /// Inverts the comparison operator for switched operands:
    /// `X < Y` becomes `Y > X`. Used to move a `Guard` to the other side.
    pub fn neg(self) -> RelOp {
        match self {
            RelOp::Equal | RelOp::Unequal => self,
            RelOp::Less => RelOp::Greater,
            RelOp::Greater => RelOp::Less,
            RelOp::LessOrEq => RelOp::GreaterOrEq,
            RelOp::GreaterOrEq => RelOp::LessOrEq,
        }
    }

    /// Returns the logically opposite operator: `X = Y` becomes `X != Y`.
    pub fn invert(self) -> RelOp {
        match self {
            RelOp::Equal => RelOp::Unequal,
            RelOp::Unequal => RelOp::Equal,
            RelOp::Less => RelOp::GreaterOrEq,
            RelOp::Greater => RelOp::LessOrEq,
            RelOp::LessOrEq => RelOp::Greater,
            RelOp::GreaterOrEq => RelOp::Less,
        }
    }

    /// Evaluates the comparison given the `precedes` ordering of two ground
    /// terms (passed in as an `Ordering` already computed by the caller).
    pub fn eval_ordering(self, order: Ordering) -> bool {
        match self {
            RelOp::Equal => order == Ordering::Equal,
            RelOp::Unequal => order != Ordering::Equal,
            RelOp::Less => order == Ordering::Less,
            RelOp::Greater => order == Ordering::Greater,
            RelOp::LessOrEq => order != Ordering::Greater,
            RelOp::GreaterOrEq => order != Ordering::Less,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Equal => "=",
            RelOp::Unequal => "!=",
            RelOp::Less => "<",
            RelOp::Greater => ">",
            RelOp::LessOrEq => "<=",
            RelOp::GreaterOrEq => ">=",
        };
        write!(f, "{s}")
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    Plus,
    Minus,
    Times,
    Div,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArithOp::Plus => "+",
            ArithOp::Minus => "-",
            ArithOp::Times => "*",
            ArithOp::Div => "/",
        };
        write!(f, "{s}")
    }
}

/// Set-aggregate functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggrOp {
    Count,
    Sum,
    Min,
    Max,
}

impl fmt::Display for AggrOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggrOp::Count => "#count",
            AggrOp::Sum => "#sum",
            AggrOp::Min => "#min",
            AggrOp::Max => "#max",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neg_flips_order_preserves_equality_kind() {
        assert_eq!(RelOp::Less.neg(), RelOp::Greater);
        assert_eq!(RelOp::GreaterOrEq.neg(), RelOp::LessOrEq);
        assert_eq!(RelOp::Equal.neg(), RelOp::Equal);
        assert_eq!(RelOp::Unequal.neg(), RelOp::Unequal);
    }

    #[test]
    fn invert_is_involution() {
        for op in [
            RelOp::Equal,
            RelOp::Unequal,
            RelOp::Less,
            RelOp::Greater,
            RelOp::LessOrEq,
            RelOp::GreaterOrEq,
        ] {
            assert_eq!(op.invert().invert(), op);
        }
    }

    #[test]
    fn eval_ordering_matches_semantics() {
        assert!(RelOp::LessOrEq.eval_ordering(Ordering::Equal));
        assert!(RelOp::LessOrEq.eval_ordering(Ordering::Less));
        assert!(!RelOp::LessOrEq.eval_ordering(Ordering::Greater));
        assert!(RelOp::GreaterOrEq.eval_ordering(Ordering::Greater));
    }
}
