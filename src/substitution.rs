//! Substitutions and one-sided pattern matching (spec §4.1).
//!
//! Grounded on `ground_slash/program/literals/literal.py`'s
//! `LiteralCollection.match` (disjoint-union composition on every pairing
//! attempt, backtracking to the next candidate on `AssignmentError`).

use crate::error::AssignmentError;
use crate::term::{Term, VarId};
use std::collections::BTreeMap;

/// A partial map from variables to terms. Missing variables default to
/// themselves under `apply` (identity default).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitution {
    map: BTreeMap<VarId, Term>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, id: &VarId) -> Option<&Term> {
        self.map.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VarId, &Term)> {
        self.map.iter()
    }

    /// Binds `id` to `term`. Fails if `id` is already bound to a different
    /// term.
    pub fn bind(&mut self, id: VarId, term: Term) -> Result<(), AssignmentError> {
        match self.map.get(&id) {
            Some(existing) if *existing != term => Err(AssignmentError),
            Some(_) => Ok(()),
            None => {
                self.map.insert(id, term);
                Ok(())
            }
        }
    }

    /// Applies this substitution to a term.
    pub fn apply(&self, term: &Term) -> Term {
        term.substitute(self)
    }

    /// Functional composition: `compose(t, s)` satisfies
    /// `apply(compose(t, s), e) == apply(s, apply(t, e))` (spec §8,
    /// property #3). Never fails: bindings of `self` are carried forward
    /// even where they disagree with `other`, since this models sequential
    /// application rather than a merge.
    pub fn compose(&self, other: &Substitution) -> Substitution {
        let mut result = Substitution::new();
        for (k, v) in &self.map {
            result.map.insert(k.clone(), other.apply(v));
        }
        for (k, v) in &other.map {
            result.map.entry(k.clone()).or_insert_with(|| v.clone());
        }
        result
    }

    /// Disjoint union: merges bindings from both substitutions, failing if
    /// they disagree on any variable.
    pub fn union(&self, other: &Substitution) -> Result<Substitution, AssignmentError> {
        let mut result = self.clone();
        for (k, v) in &other.map {
            result.bind(k.clone(), v.clone())?;
        }
        Ok(result)
    }
}

/// Attempts to find the most general substitution `s` such that
/// `apply(s, pattern) == target`. Fails on type mismatch, arity mismatch,
/// or assignment conflict (spec §4.1, §8 property #4).
pub fn match_term(pattern: &Term, target: &Term) -> Option<Substitution> {
    match pattern {
        Term::Variable(_) | Term::AnonVariable(_) => {
            let mut s = Substitution::new();
            s.bind(pattern.as_var_id()?, target.clone()).ok()?;
            Some(s)
        }
        Term::ArithVariable(id, _) if target.ground() => {
            let mut s = Substitution::new();
            s.bind(VarId::Arith(*id), target.clone()).ok()?;
            Some(s)
        }
        Term::ArithVariable(_, _) => None,
        Term::Infimum => matches!(target, Term::Infimum).then(Substitution::new),
        Term::Supremum => matches!(target, Term::Supremum).then(Substitution::new),
        Term::Number(a) => match target {
            Term::Number(b) if a == b => Some(Substitution::new()),
            _ => None,
        },
        Term::Str(a) => match target {
            Term::Str(b) if a == b => Some(Substitution::new()),
            _ => None,
        },
        Term::SymConst(a) => match target {
            Term::SymConst(b) if a == b => Some(Substitution::new()),
            _ => None,
        },
        Term::Functional(name, args) => match target {
            Term::Functional(tname, targs) if name == tname && args.len() == targs.len() => {
                let mut subst = Substitution::new();
                for (p, t) in args.iter().zip(targs.iter()) {
                    let m = match_term(p, t)?;
                    subst = subst.union(&m).ok()?;
                }
                Some(subst)
            }
            _ => None,
        },
        Term::Arith(_, _, _) | Term::Minus(_) => {
            // Arithmetic terms should have gone through `replace_arith`
            // before matching; a raw ground arithmetic pattern is still
            // matchable by value.
            if pattern.ground() {
                let value = pattern.simplify().ok()?;
                if value == *target {
                    Some(Substitution::new())
                } else {
                    None
                }
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::ArithOp;

    #[test]
    fn match_ground_pattern_requires_equality() {
        assert!(match_term(&Term::Number(1), &Term::Number(1)).unwrap().is_empty());
        assert!(match_term(&Term::Number(1), &Term::Number(2)).is_none());
    }

    #[test]
    fn match_variable_binds() {
        let pattern = Term::Variable("X".to_string());
        let subst = match_term(&pattern, &Term::Number(5)).unwrap();
        assert_eq!(subst.apply(&pattern), Term::Number(5));
    }

    #[test]
    fn match_functional_recurses_and_detects_conflict() {
        let pattern = Term::Functional(
            "f".into(),
            vec![Term::Variable("X".to_string()), Term::Variable("X".to_string())],
        );
        let ok = Term::Functional("f".into(), vec![Term::Number(1), Term::Number(1)]);
        assert!(match_term(&pattern, &ok).is_some());

        let conflict = Term::Functional("f".into(), vec![Term::Number(1), Term::Number(2)]);
        assert!(match_term(&pattern, &conflict).is_none());
    }

    #[test]
    fn match_arith_variable_binds_to_ground_target() {
        let pattern = Term::ArithVariable(0, Box::new(Term::Variable("X".to_string())));
        let subst = match_term(&pattern, &Term::Number(7)).unwrap();
        assert_eq!(subst.get(&VarId::Arith(0)), Some(&Term::Number(7)));
    }

    #[test]
    fn compose_matches_sequential_application() {
        let mut t = Substitution::new();
        t.bind(VarId::Named("X".to_string()), Term::Variable("Y".to_string())).unwrap();
        let mut s = Substitution::new();
        s.bind(VarId::Named("Y".to_string()), Term::Number(9)).unwrap();

        let composed = t.compose(&s);
        let e = Term::Variable("X".to_string());
        assert_eq!(composed.apply(&e), s.apply(&t.apply(&e)));
    }

    #[test]
    fn union_detects_conflicts() {
        let mut a = Substitution::new();
        a.bind(VarId::Named("X".to_string()), Term::Number(1)).unwrap();
        let mut b = Substitution::new();
        b.bind(VarId::Named("X".to_string()), Term::Number(2)).unwrap();
        assert!(a.union(&b).is_err());

        let arith = Term::Arith(ArithOp::Plus, Box::new(Term::Number(1)), Box::new(Term::Number(1)));
        assert!(match_term(&arith, &Term::Number(2)).is_some());
    }
}
