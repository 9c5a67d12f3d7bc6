//! Safety characterization (spec §4.2).
//!
//! A `SafetyTriplet` describes which variables an expression binds. The
//! `rules` component models deferred bindings ("X becomes safe once S is
//! safe") that [`SafetyTriplet::closure`] resolves by repeated promotion.

use crate::term::VarId;
use std::collections::BTreeSet;

/// A deferred binding: `var` becomes safe once every variable in
/// `depends_on` is safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyRule {
    pub var: VarId,
    pub depends_on: BTreeSet<VarId>,
}

/// Safety characterization of an expression or of a whole rule body after
/// closure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SafetyTriplet {
    pub safe: BTreeSet<VarId>,
    pub unsafe_vars: BTreeSet<VarId>,
    pub rules: Vec<SafetyRule>,
}

impl SafetyTriplet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every variable in `vars` is unconditionally safe (e.g. the
    /// arguments of a positive predicate literal).
    pub fn safe_vars(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self { safe: vars.into_iter().collect(), ..Self::default() }
    }

    /// Every variable in `vars` is unsafe unless bound elsewhere (e.g. the
    /// variables of a NAF literal).
    pub fn unsafe_vars(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self { unsafe_vars: vars.into_iter().collect(), ..Self::default() }
    }

    /// A single deferred rule, with no unconditional safe/unsafe variables.
    pub fn rule(var: VarId, depends_on: BTreeSet<VarId>) -> Self {
        Self { rules: vec![SafetyRule { var, depends_on }], ..Self::default() }
    }

    /// Merges triplets and repeatedly promotes rules whose dependencies
    /// are already safe, until a fixpoint is reached. Variables left in
    /// `unsafe_vars` afterward never became safe.
    pub fn closure<'a>(triplets: impl IntoIterator<Item = &'a SafetyTriplet>) -> SafetyTriplet {
        let mut safe = BTreeSet::new();
        let mut unsafe_vars = BTreeSet::new();
        let mut pending: Vec<SafetyRule> = Vec::new();

        for triplet in triplets {
            safe.extend(triplet.safe.iter().cloned());
            unsafe_vars.extend(triplet.unsafe_vars.iter().cloned());
            pending.extend(triplet.rules.iter().cloned());
        }

        loop {
            let mut progressed = false;
            let mut still_pending = Vec::with_capacity(pending.len());
            for rule in pending.drain(..) {
                if rule.depends_on.is_subset(&safe) {
                    safe.insert(rule.var.clone());
                    progressed = true;
                } else {
                    still_pending.push(rule);
                }
            }
            pending = still_pending;
            if !progressed {
                break;
            }
        }

        unsafe_vars.retain(|v| !safe.contains(v));

        SafetyTriplet { safe, unsafe_vars, rules: pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str) -> VarId {
        VarId::Named(name.to_string())
    }

    #[test]
    fn closure_promotes_satisfied_rules() {
        let t1 = SafetyTriplet::safe_vars([v("X")]);
        let mut deps = BTreeSet::new();
        deps.insert(v("X"));
        let t2 = SafetyTriplet::rule(v("Y"), deps);

        let result = SafetyTriplet::closure([&t1, &t2]);
        assert!(result.safe.contains(&v("X")));
        assert!(result.safe.contains(&v("Y")));
        assert!(result.unsafe_vars.is_empty());
    }

    #[test]
    fn closure_leaves_unsatisfiable_rule_vars_unsafe() {
        let mut deps = BTreeSet::new();
        deps.insert(v("Z"));
        let rule_triplet = SafetyTriplet::rule(v("Y"), deps);
        let unsafe_triplet = SafetyTriplet::unsafe_vars([v("Y")]);

        let result = SafetyTriplet::closure([&rule_triplet, &unsafe_triplet]);
        assert!(!result.safe.contains(&v("Y")));
        assert!(result.unsafe_vars.contains(&v("Y")));
    }

    #[test]
    fn safe_elsewhere_overrides_naf_unsafe() {
        let positive = SafetyTriplet::safe_vars([v("X")]);
        let naf = SafetyTriplet::unsafe_vars([v("X")]);
        let result = SafetyTriplet::closure([&positive, &naf]);
        assert!(result.safe.contains(&v("X")));
        assert!(result.unsafe_vars.is_empty());
    }
}
