//! Literal selection strategy for the instantiation loop (spec §4.5, §4.8).
//!
//! Grounded on `aspy/grounder/grounder.py`'s `instantiate_module`/`instantiate`
//! ordering: a rule is never ground atom-by-atom in body order; instead the
//! grounder always prefers a positive predicate occurrence (something that
//! can *bind* variables) over a literal that can only *filter* an already-
//! complete substitution.

use crate::literal::{CompLiteral, Literal, Placeholder};
use crate::operators::RelOp;
use crate::term::{Term, VarId};

/// Selects the index, within an already-substituted body, of the next
/// literal to process. Returns `None` when nothing is ready (every
/// remaining literal is a non-ground comparison or a non-ground NAF atom —
/// this should not happen for a statement that passed safety checking, but
/// the grounder does not trust that invariant blindly).
pub fn select_literal(substituted: &[Literal]) -> Option<usize> {
    for (i, lit) in substituted.iter().enumerate() {
        if is_positive_binder(lit) {
            return Some(i);
        }
    }
    for (i, lit) in substituted.iter().enumerate() {
        if is_ready_check(lit) {
            return Some(i);
        }
    }
    None
}

fn is_positive_binder(lit: &Literal) -> bool {
    match lit {
        Literal::Pred(p) => !p.naf,
        Literal::Placeholder(ph) => ph.atom().is_some(),
        _ => false,
    }
}

fn is_ready_check(lit: &Literal) -> bool {
    match lit {
        Literal::Pred(p) => p.naf && p.ground(),
        Literal::Comp(c) => c.ground() || assignable_var(c).is_some(),
        Literal::Placeholder(Placeholder::TrueConst) | Literal::Placeholder(Placeholder::FalseConst) => true,
        _ => false,
    }
}

/// If `c` is an `Equal` comparison with exactly one side an unbound
/// variable and the other side ground, returns that variable and the
/// ground term it should be bound to (spec §4.2: `Equal(X, term)`
/// contributes the safety rule `X <= vars(term)`, i.e. `X` is an
/// assignment target, not merely a filter).
pub fn assignable_var(c: &CompLiteral) -> Option<(VarId, &Term)> {
    if c.op != RelOp::Equal {
        return None;
    }
    if let (Some(var), true) = (c.left.as_var_id(), c.right.ground()) {
        if !matches!(c.left, Term::ArithVariable(_, _)) {
            return Some((var, &c.right));
        }
    }
    if let (Some(var), true) = (c.right.as_var_id(), c.left.ground()) {
        if !matches!(c.right, Term::ArithVariable(_, _)) {
            return Some((var, &c.left));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::PredLiteral;

    #[test]
    fn prefers_positive_predicate_over_comparison() {
        let body = vec![
            Literal::Comp(CompLiteral::new(RelOp::Equal, Term::Number(1), Term::Number(1))),
            Literal::Pred(PredLiteral::new("p", vec![Term::Variable("X".to_string())])),
        ];
        assert_eq!(select_literal(&body), Some(1));
    }

    #[test]
    fn falls_back_to_ground_naf_or_comparison() {
        let body = vec![
            Literal::Pred(PredLiteral::new("q", vec![Term::Number(1)]).with_naf()),
            Literal::Comp(CompLiteral::new(RelOp::Equal, Term::Number(1), Term::Number(1))),
        ];
        assert_eq!(select_literal(&body), Some(0));
    }

    #[test]
    fn equal_with_unbound_left_variable_is_assignable() {
        let c = CompLiteral::new(RelOp::Equal, Term::Variable("X".to_string()), Term::Number(5));
        let (var, value) = assignable_var(&c).unwrap();
        assert_eq!(var, VarId::Named("X".to_string()));
        assert_eq!(*value, Term::Number(5));
    }
}
