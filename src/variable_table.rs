//! Per-statement variable registry (spec §3).
//!
//! Grounded on `aspy/program/symbol_table.py`'s counter-per-special-char
//! design, adapted from predicate symbols to the three kinds of variables a
//! statement can contain: user variables, anonymous variables and
//! arithmetic variables minted during [`crate::term::Term::replace_arith`].

use crate::term::{Term, VarId};
use std::collections::BTreeSet;

/// Owns the fresh-id counters and the registry of variables for a single
/// statement being built or rewritten.
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    next_anon_id: u64,
    next_arith_id: u64,
    user_vars: BTreeSet<String>,
    anon_ids: BTreeSet<u64>,
    arith_ids: BTreeSet<u64>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or re-registers) a user variable by name.
    pub fn register_user_var(&mut self, name: impl Into<String>) -> VarId {
        let name = name.into();
        self.user_vars.insert(name.clone());
        VarId::Named(name)
    }

    /// Mints a fresh anonymous variable.
    pub fn fresh_anon_var(&mut self) -> Term {
        let id = self.next_anon_id;
        self.next_anon_id += 1;
        self.anon_ids.insert(id);
        Term::AnonVariable(id)
    }

    /// Mints a fresh arithmetic variable standing in for `source_expr`.
    pub fn fresh_arith_var(&mut self, source_expr: Term) -> Term {
        let id = self.next_arith_id;
        self.next_arith_id += 1;
        self.arith_ids.insert(id);
        Term::ArithVariable(id, Box::new(source_expr))
    }

    pub fn user_vars(&self) -> &BTreeSet<String> {
        &self.user_vars
    }

    /// All variables registered in this table, as `VarId`s.
    pub fn all_vars(&self) -> BTreeSet<VarId> {
        let mut vars: BTreeSet<VarId> = self.user_vars.iter().cloned().map(VarId::Named).collect();
        vars.extend(self.anon_ids.iter().copied().map(VarId::Anon));
        vars.extend(self.arith_ids.iter().copied().map(VarId::Arith));
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_monotone_and_unique() {
        let mut table = VariableTable::new();
        let a = table.fresh_anon_var();
        let b = table.fresh_anon_var();
        assert_ne!(a, b);

        let x0 = table.fresh_arith_var(Term::Number(1));
        let x1 = table.fresh_arith_var(Term::Number(2));
        assert_ne!(x0, x1);
    }

    #[test]
    fn all_vars_collects_every_kind() {
        let mut table = VariableTable::new();
        table.register_user_var("X");
        table.fresh_anon_var();
        table.fresh_arith_var(Term::Number(1));

        let vars = table.all_vars();
        assert_eq!(vars.len(), 3);
    }
}
