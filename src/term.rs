//! Terms: the algebraic data model at the bottom of the grounder (spec §3).
//!
//! Grounded on `aspy/program/operators.py` (`RelOp.eval` delegates to
//! `precedes`) and the term-related test files retrieved from
//! `original_source/` (`test_term.py`, `test_arithmetic.py`, `test_special.py`)
//! for the exact simplification and ordering rules.

use crate::error::{ArithmeticError, InternalError};
use crate::operators::ArithOp;
use crate::substitution::Substitution;
use crate::variable_table::VariableTable;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Identity of a variable-like term for substitution/safety purposes.
/// `Named` is a user variable, `Anon` an anonymous variable (`_`), `Arith`
/// an arithmetic variable minted by [`Term::replace_arith`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VarId {
    Named(String),
    Anon(u64),
    Arith(u64),
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarId::Named(name) => write!(f, "{name}"),
            VarId::Anon(id) => write!(f, "_{id}"),
            VarId::Arith(id) => write!(f, "τ{id}"),
        }
    }
}

/// Reserved leading characters for system-generated symbols (spec §6).
pub const RESERVED_CHARS: [char; 4] = ['α', 'ε', 'η', 'τ'];

/// A term of the grounder's value language.
///
/// `PartialOrd`/`Ord` are structural (derived variant/field order), used
/// only to key `BTreeSet<PredLiteral>`/`BTreeMap` collections during
/// instantiation — they are NOT the total order over ground terms that
/// `precedes`/`cmp_ground` implement for ASP semantics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    /// Least element of the total order; below every other term.
    Infimum,
    /// Greatest element of the total order; above every other term.
    Supremum,
    Number(i64),
    /// A string constant. Stored as UTF-8 text; the spec's "bytes" payload
    /// is realized as `String` since the dialect's string literals are
    /// textual.
    Str(String),
    /// A symbolic constant (nullary functor). Name must start lowercase or
    /// with a reserved character.
    SymConst(String),
    /// A user variable. Name must start uppercase or with 'τ'.
    Variable(String),
    /// An anonymous variable (`_` in concrete syntax), identified by a
    /// per-statement fresh id.
    AnonVariable(u64),
    /// A variable standing in for a non-ground arithmetic sub-expression,
    /// carrying that original expression so it can be recovered once the
    /// variable is bound (spec §3 invariants).
    ArithVariable(u64, Box<Term>),
    Functional(String, Vec<Term>),
    Arith(ArithOp, Box<Term>, Box<Term>),
    Minus(Box<Term>),
}

impl Term {
    /// Category rank used by the ground total order: Infimum < Number <
    /// String < SymConst < Functional < Supremum. Only defined for ground,
    /// already-simplified (no raw `Arith`/`Minus`) terms.
    fn category(&self) -> Result<u8, InternalError> {
        match self {
            Term::Infimum => Ok(0),
            Term::Number(_) => Ok(1),
            Term::Str(_) => Ok(2),
            Term::SymConst(_) => Ok(3),
            Term::Functional(_, _) => Ok(4),
            Term::Supremum => Ok(5),
            Term::Variable(_) | Term::AnonVariable(_) | Term::ArithVariable(_, _) => {
                Err(InternalError::new("precedes: term is not ground"))
            }
            Term::Arith(_, _, _) | Term::Minus(_) => {
                Err(InternalError::new("precedes: arithmetic term not in canonical form"))
            }
        }
    }

    /// Whether this term contains no variables.
    pub fn ground(&self) -> bool {
        match self {
            Term::Infimum | Term::Supremum | Term::Number(_) | Term::Str(_) | Term::SymConst(_) => true,
            Term::Variable(_) | Term::AnonVariable(_) | Term::ArithVariable(_, _) => false,
            Term::Functional(_, args) => args.iter().all(Term::ground),
            Term::Arith(_, l, r) => l.ground() && r.ground(),
            Term::Minus(x) => x.ground(),
        }
    }

    /// Variables occurring in this term (arithmetic variables count as one
    /// opaque variable of their own; see [`Term::source_vars`] to look
    /// inside).
    pub fn vars(&self) -> BTreeSet<VarId> {
        match self {
            Term::Variable(name) => [VarId::Named(name.clone())].into_iter().collect(),
            Term::AnonVariable(id) => [VarId::Anon(*id)].into_iter().collect(),
            Term::ArithVariable(id, _) => [VarId::Arith(*id)].into_iter().collect(),
            Term::Functional(_, args) => args.iter().flat_map(Term::vars).collect(),
            Term::Arith(_, l, r) => l.vars().into_iter().chain(r.vars()).collect(),
            Term::Minus(x) => x.vars(),
            _ => BTreeSet::new(),
        }
    }

    /// Variables of the original arithmetic expression an `ArithVariable`
    /// stands in for (used by safety characterization); for any other term,
    /// same as [`Term::vars`].
    pub fn source_vars(&self) -> BTreeSet<VarId> {
        match self {
            Term::ArithVariable(_, expr) => expr.vars(),
            other => other.vars(),
        }
    }

    pub(crate) fn as_var_id(&self) -> Option<VarId> {
        match self {
            Term::Variable(name) => Some(VarId::Named(name.clone())),
            Term::AnonVariable(id) => Some(VarId::Anon(*id)),
            Term::ArithVariable(id, _) => Some(VarId::Arith(*id)),
            _ => None,
        }
    }

    /// Recursively applies a substitution.
    pub fn substitute(&self, subst: &Substitution) -> Term {
        match self {
            Term::Variable(_) | Term::AnonVariable(_) => {
                let id = self.as_var_id().unwrap();
                subst.get(&id).cloned().unwrap_or_else(|| self.clone())
            }
            Term::ArithVariable(id, expr) => match subst.get(&VarId::Arith(*id)) {
                Some(bound) => bound.clone(),
                None => Term::ArithVariable(*id, Box::new(expr.substitute(subst))),
            },
            Term::Functional(name, args) => {
                Term::Functional(name.clone(), args.iter().map(|a| a.substitute(subst)).collect())
            }
            Term::Arith(op, l, r) => {
                Term::Arith(*op, Box::new(l.substitute(subst)), Box::new(r.substitute(subst)))
            }
            Term::Minus(x) => Term::Minus(Box::new(x.substitute(subst))),
            other => other.clone(),
        }
    }

    /// Replaces every maximal non-ground arithmetic sub-term with a fresh
    /// `ArithVariable` registered in `var_table` (spec §3). Ground
    /// arithmetic is left untouched here; [`Term::simplify`] folds it.
    pub fn replace_arith(&self, var_table: &mut VariableTable) -> Term {
        match self {
            Term::Arith(_, _, _) | Term::Minus(_) => {
                if self.ground() {
                    self.clone()
                } else {
                    var_table.fresh_arith_var(self.clone())
                }
            }
            Term::Functional(name, args) => {
                Term::Functional(name.clone(), args.iter().map(|a| a.replace_arith(var_table)).collect())
            }
            other => other.clone(),
        }
    }

    /// Algebraic simplification: constant folding, `x+0 -> x`, `x*0 -> 0`
    /// (only when `x` is ground), `x*1 -> x`, `x*-1 -> Minus(x)`, double
    /// negation elimination. Idempotent. Fails on division by zero.
    pub fn simplify(&self) -> Result<Term, ArithmeticError> {
        match self {
            Term::Arith(op, l, r) => {
                let l = l.simplify()?;
                let r = r.simplify()?;
                simplify_arith(*op, l, r)
            }
            Term::Minus(inner) => {
                let inner = inner.simplify()?;
                match inner {
                    Term::Minus(x) => Ok(*x),
                    Term::Number(n) => Ok(Term::Number(-n)),
                    other => Ok(Term::Minus(Box::new(other))),
                }
            }
            Term::Functional(name, args) => {
                let args = args.iter().map(Term::simplify).collect::<Result<Vec<_>, _>>()?;
                Ok(Term::Functional(name.clone(), args))
            }
            other => Ok(other.clone()),
        }
    }

    /// Evaluates a ground arithmetic term to a `Number`. Delegates to
    /// [`Term::simplify`] and requires the result to fold to a number.
    pub fn eval(&self) -> Result<i64, ArithmeticError> {
        match self.simplify()? {
            Term::Number(n) => Ok(n),
            _ => Err(ArithmeticError::NonGroundEvaluation),
        }
    }

    /// Total order comparison on ground terms (property #1 of spec §8).
    /// Fails loudly (`InternalError`) on non-ground input.
    pub fn cmp_ground(&self, other: &Term) -> Result<Ordering, InternalError> {
        let a = self
            .simplify()
            .map_err(|e| InternalError::new(format!("precedes: {e}")))?;
        let b = other
            .simplify()
            .map_err(|e| InternalError::new(format!("precedes: {e}")))?;

        let ca = a.category()?;
        let cb = b.category()?;
        if ca != cb {
            return Ok(ca.cmp(&cb));
        }

        match (&a, &b) {
            (Term::Infimum, Term::Infimum) | (Term::Supremum, Term::Supremum) => Ok(Ordering::Equal),
            (Term::Number(x), Term::Number(y)) => Ok(x.cmp(y)),
            (Term::Str(x), Term::Str(y)) => Ok(x.cmp(y)),
            (Term::SymConst(x), Term::SymConst(y)) => Ok(x.cmp(y)),
            (Term::Functional(n1, a1), Term::Functional(n2, a2)) => {
                match n1.cmp(n2) {
                    Ordering::Equal => {}
                    other => return Ok(other),
                }
                match a1.len().cmp(&a2.len()) {
                    Ordering::Equal => {}
                    other => return Ok(other),
                }
                for (x, y) in a1.iter().zip(a2.iter()) {
                    match x.cmp_ground(y)? {
                        Ordering::Equal => continue,
                        other => return Ok(other),
                    }
                }
                Ok(Ordering::Equal)
            }
            _ => Err(InternalError::new("precedes: mismatched term categories")),
        }
    }

    /// `self <= other` under the total order (spec §8, property #1).
    pub fn precedes(&self, other: &Term) -> Result<bool, InternalError> {
        Ok(self.cmp_ground(other)? != Ordering::Greater)
    }
}

fn is_zero(t: &Term) -> bool {
    matches!(t, Term::Number(0))
}

fn is_one(t: &Term) -> bool {
    matches!(t, Term::Number(1))
}

fn is_neg_one(t: &Term) -> bool {
    matches!(t, Term::Number(-1))
}

fn simplify_arith(op: ArithOp, l: Term, r: Term) -> Result<Term, ArithmeticError> {
    if let (Term::Number(a), Term::Number(b)) = (&l, &r) {
        let value = match op {
            ArithOp::Plus => a + b,
            ArithOp::Minus => a - b,
            ArithOp::Times => a * b,
            ArithOp::Div => {
                if *b == 0 {
                    return Err(ArithmeticError::DivisionByZero);
                }
                a / b
            }
        };
        return Ok(Term::Number(value));
    }

    match op {
        ArithOp::Plus => {
            if is_zero(&r) {
                return Ok(l);
            }
            if is_zero(&l) {
                return Ok(r);
            }
            Ok(Term::Arith(op, Box::new(l), Box::new(r)))
        }
        ArithOp::Minus => {
            if is_zero(&r) {
                return Ok(l);
            }
            Ok(Term::Arith(op, Box::new(l), Box::new(r)))
        }
        ArithOp::Times => {
            if (is_zero(&r) && l.ground()) || (is_zero(&l) && r.ground()) {
                return Ok(Term::Number(0));
            }
            if is_one(&r) {
                return Ok(l);
            }
            if is_one(&l) {
                return Ok(r);
            }
            if is_neg_one(&r) {
                return Term::Minus(Box::new(l)).simplify();
            }
            if is_neg_one(&l) {
                return Term::Minus(Box::new(r)).simplify();
            }
            Ok(Term::Arith(op, Box::new(l), Box::new(r)))
        }
        ArithOp::Div => Ok(Term::Arith(op, Box::new(l), Box::new(r))),
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Infimum => write!(f, "#inf"),
            Term::Supremum => write!(f, "#sup"),
            Term::Number(n) => write!(f, "{n}"),
            Term::Str(s) => write!(f, "\"{s}\""),
            Term::SymConst(s) => write!(f, "{s}"),
            Term::Variable(name) => write!(f, "{name}"),
            Term::AnonVariable(_) => write!(f, "_"),
            Term::ArithVariable(_, expr) => write!(f, "{expr}"),
            Term::Functional(name, args) => {
                if args.is_empty() {
                    write!(f, "{name}")
                } else {
                    write!(f, "{name}(")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ",")?;
                        }
                        write!(f, "{a}")?;
                    }
                    write!(f, ")")
                }
            }
            Term::Arith(op, l, r) => write!(f, "({l}{op}{r})"),
            Term::Minus(x) => write!(f, "-{x}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order_reflexive_and_antisymmetric() {
        let a = Term::Number(3);
        let b = Term::SymConst("foo".to_string());
        assert!(a.precedes(&a).unwrap());
        assert!(a.precedes(&b).unwrap());
        assert!(!b.precedes(&a).unwrap());
    }

    #[test]
    fn total_order_categories() {
        assert!(Term::Infimum.precedes(&Term::Number(-999)).unwrap());
        assert!(Term::Number(5).precedes(&Term::Str("a".into())).unwrap());
        assert!(Term::Str("z".into()).precedes(&Term::SymConst("a".into())).unwrap());
        assert!(Term::SymConst("z".into())
            .precedes(&Term::Functional("a".into(), vec![]))
            .unwrap());
        assert!(Term::Functional("z".into(), vec![]).precedes(&Term::Supremum).unwrap());
    }

    #[test]
    fn precedes_fails_on_non_ground() {
        let x = Term::Variable("X".to_string());
        assert!(x.precedes(&Term::Number(1)).is_err());
    }

    #[test]
    fn functional_order_is_lexicographic() {
        let f1 = Term::Functional("f".into(), vec![Term::Number(1)]);
        let f2 = Term::Functional("f".into(), vec![Term::Number(2)]);
        assert!(f1.precedes(&f2).unwrap());
        assert!(!f2.precedes(&f1).unwrap());

        let g = Term::Functional("g".into(), vec![Term::Number(0)]);
        assert!(f2.precedes(&g).unwrap());
    }

    #[test]
    fn simplify_is_idempotent() {
        let e = Term::Arith(
            ArithOp::Plus,
            Box::new(Term::Number(2)),
            Box::new(Term::Arith(ArithOp::Times, Box::new(Term::Number(3)), Box::new(Term::Number(0)))),
        );
        let once = e.simplify().unwrap();
        let twice = once.simplify().unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, Term::Number(2));
    }

    #[test]
    fn simplify_folds_identities() {
        let x = Term::Variable("X".to_string());
        let plus_zero = Term::Arith(ArithOp::Plus, Box::new(x.clone()), Box::new(Term::Number(0)));
        assert_eq!(plus_zero.simplify().unwrap(), x);

        let times_neg_one = Term::Arith(ArithOp::Times, Box::new(x.clone()), Box::new(Term::Number(-1)));
        assert_eq!(times_neg_one.simplify().unwrap(), Term::Minus(Box::new(x.clone())));

        let double_neg = Term::Minus(Box::new(Term::Minus(Box::new(x.clone()))));
        assert_eq!(double_neg.simplify().unwrap(), x);
    }

    #[test]
    fn division_by_zero_fails() {
        let e = Term::Arith(ArithOp::Div, Box::new(Term::Number(1)), Box::new(Term::Number(0)));
        assert!(e.simplify().is_err());
    }

    #[test]
    fn replace_arith_mints_fresh_variable_for_nonground_only() {
        let mut table = VariableTable::new();
        let x = Term::Variable("X".to_string());
        let expr = Term::Arith(ArithOp::Plus, Box::new(x.clone()), Box::new(Term::Number(1)));
        let replaced = expr.replace_arith(&mut table);
        assert!(matches!(replaced, Term::ArithVariable(_, _)));

        let ground_expr = Term::Arith(ArithOp::Plus, Box::new(Term::Number(1)), Box::new(Term::Number(1)));
        let replaced_ground = ground_expr.replace_arith(&mut table);
        assert_eq!(replaced_ground, ground_expr);
    }

    #[test]
    fn substitute_resolves_arith_variable() {
        let mut subst = Substitution::new();
        subst.bind(VarId::Arith(0), Term::Number(5)).unwrap();
        let av = Term::ArithVariable(0, Box::new(Term::Variable("X".to_string())));
        assert_eq!(av.substitute(&subst), Term::Number(5));
    }
}
