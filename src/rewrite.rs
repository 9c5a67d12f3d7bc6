//! Aggregate and choice rewriting (spec §4.4).
//!
//! Grounded on `ground_slash/grounding/propagation/{aggregates,choice}.py`,
//! which assume exactly this base-rule/element-rule decomposition when
//! consuming placeholder instances.

use crate::literal::{AggregateLiteral, ChoiceExprLiteral, CompLiteral, Guard, Literal, LiteralCollection, Placeholder, PredLiteral};
use crate::statement::{
    AggrBaseRule, AggrElemRule, ChoiceBaseRule, ChoiceElemRule, Constraint, NormalRule, Program, Statement, WeakConstraint,
};
use crate::term::{Term, VarId};
use std::collections::{BTreeMap, BTreeSet};

/// Per-`ref` metadata the propagator needs to reconstruct the original
/// aggregate/choice literal once its placeholder's ground instances have
/// been decided (spec §4.6). Keyed by the `ref` minted during rewriting.
///
/// Each entry pairs the original (variable-carrying) literal with the
/// `globals` term list used as the base/element rules' trailing args, in
/// the same order — the propagator rebuilds a substitution by zipping that
/// template against a ground placeholder atom's terms.
#[derive(Debug, Clone, Default)]
pub struct RewriteMeta {
    pub aggregates: BTreeMap<u64, (AggregateLiteral, Vec<Term>)>,
    pub choices: BTreeMap<u64, (ChoiceExprLiteral, Vec<Term>)>,
}

/// Issues globally-unique `ref` identifiers for one rewrite pass.
#[derive(Debug, Default)]
pub struct RefCounter {
    next: u64,
}

impl RefCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> u64 {
        let r = self.next;
        self.next += 1;
        r
    }
}

fn var_id_to_term(id: &VarId) -> Option<Term> {
    match id {
        VarId::Named(name) => Some(Term::Variable(name.clone())),
        VarId::Anon(n) => Some(Term::AnonVariable(*n)),
        // Arithmetic variables cannot be reconstructed without their
        // source expression at this point; they are excluded from
        // globals/locals (rare in practice, since aggregates are usually
        // keyed on plain variables).
        VarId::Arith(_) => None,
    }
}

fn vars_to_terms(vars: &BTreeSet<VarId>) -> Vec<Term> {
    vars.iter().filter_map(var_id_to_term).collect()
}

fn symbol_name(prefix: char, reference: u64) -> String {
    format!("{prefix}_{reference}")
}

fn elem_symbol_name(prefix: char, reference: u64, elem_id: usize) -> String {
    format!("{prefix}_{reference}_{elem_id}")
}

/// Rewrites every aggregate literal in `body`, appending the generated
/// base/element rules to `aux` and returning the rewritten body with each
/// aggregate replaced by a placeholder atom. `outer_vars` are every
/// variable occurring elsewhere in the statement (head, other body
/// literals already processed, weak-constraint terms, etc.) used to split
/// globals from locals.
fn rewrite_aggregates(
    body: &LiteralCollection,
    outer_vars: &BTreeSet<VarId>,
    counter: &mut RefCounter,
    aux: &mut Vec<Statement>,
    meta: &mut RewriteMeta,
) -> LiteralCollection {
    let literals: Vec<Literal> = body.iter().cloned().collect();
    // `outer_vars` already includes every variable elsewhere in the
    // statement; add every OTHER body literal's variables too (not just
    // those processed so far) so an aggregate's globals capture shared
    // variables regardless of where in the body it sits.
    let mut rest_vars = outer_vars.clone();
    for lit in &literals {
        if !matches!(lit, Literal::Aggregate(_)) {
            rest_vars.extend(lit.vars());
        }
    }

    let mut rewritten = Vec::with_capacity(literals.len());
    for lit in literals {
        let Literal::Aggregate(aggr) = &lit else {
            rewritten.push(lit);
            continue;
        };
        let reference = counter.fresh();
        let globals_vars: BTreeSet<VarId> = aggr.vars().intersection(&rest_vars).cloned().collect();
        let globals = vars_to_terms(&globals_vars);
        let base_body_rest: LiteralCollection = LiteralCollection::new(rewritten.iter().cloned());

        meta.aggregates.insert(reference, (aggr.clone(), globals.clone()));
        rewritten.push(rewrite_one_aggregate(aggr, reference, &globals, &base_body_rest, counter, aux));
    }
    LiteralCollection::new(rewritten)
}

fn rewrite_one_aggregate(
    aggr: &AggregateLiteral,
    reference: u64,
    globals: &[Term],
    rest_of_body: &LiteralCollection,
    _counter: &mut RefCounter,
    aux: &mut Vec<Statement>,
) -> Literal {
    let base_head = PredLiteral::new(symbol_name('\u{3b5}', reference), globals.to_vec());
    let base_body = rest_of_body.with(base_guard_literals(aggr));
    aux.push(Statement::AggrBaseRule(AggrBaseRule {
        reference,
        head: base_head.clone(),
        globals: globals.to_vec(),
        body: base_body,
    }));

    let globals_set: BTreeSet<VarId> = globals.iter().flat_map(Term::vars).collect();
    for (elem_id, element) in aggr.elements.iter().enumerate() {
        let local_vars: BTreeSet<VarId> = element.vars().difference(&globals_set).cloned().collect();
        let mut locals = vars_to_terms(&local_vars);
        let mut args = Vec::with_capacity(locals.len() + globals.len());
        args.append(&mut locals);
        args.extend(globals.iter().cloned());
        let elem_head = PredLiteral::new(elem_symbol_name('\u{3b7}', reference, elem_id), args);
        let elem_body = rest_of_body.with(element.condition.iter().cloned());
        aux.push(Statement::AggrElemRule(AggrElemRule {
            reference,
            elem_id,
            head: elem_head,
            values: element.terms.clone(),
            globals: globals.to_vec(),
            body: elem_body,
        }));
    }

    Literal::Placeholder(Placeholder::AggrBase { reference, atom: base_head })
}

/// `guard_comparison`: the literals asserting that the aggregate function's
/// neutral base value satisfies whichever guards are present (spec §4.4).
fn base_guard_literals(aggr: &AggregateLiteral) -> Vec<Literal> {
    let base_value = aggr.func.base_value();
    let mut literals = Vec::new();
    if let Some(g) = &aggr.left_guard {
        literals.push(Literal::Comp(CompLiteral::new(g.op(), base_value.clone(), g.bound().clone())));
    }
    if let Some(g) = &aggr.right_guard {
        literals.push(Literal::Comp(CompLiteral::new(g.op(), base_value.clone(), g.bound().clone())));
    }
    literals
}

fn rewrite_choice(
    choice: &ChoiceExprLiteral,
    body: &LiteralCollection,
    outer_vars: &BTreeSet<VarId>,
    counter: &mut RefCounter,
    aux: &mut Vec<Statement>,
    meta: &mut RewriteMeta,
) -> NormalRule {
    let reference = counter.fresh();
    let mut rest_vars = outer_vars.clone();
    rest_vars.extend(body.vars());
    let globals_vars: BTreeSet<VarId> = choice.vars().intersection(&rest_vars).cloned().collect();
    let globals = vars_to_terms(&globals_vars);
    meta.choices.insert(reference, (choice.clone(), globals.clone()));

    let base_head = PredLiteral::new(symbol_name('\u{3c7}', reference), globals.clone());
    let base_value = Term::Number(0);
    let mut base_guards = Vec::new();
    if let Some(g) = &choice.left_guard {
        base_guards.push(Literal::Comp(CompLiteral::new(g.op(), base_value.clone(), g.bound().clone())));
    }
    if let Some(g) = &choice.right_guard {
        base_guards.push(Literal::Comp(CompLiteral::new(g.op(), base_value.clone(), g.bound().clone())));
    }
    aux.push(Statement::ChoiceBaseRule(ChoiceBaseRule {
        reference,
        head: base_head.clone(),
        globals: globals.clone(),
        body: body.with(base_guards),
    }));

    for (elem_id, element) in choice.elements.iter().enumerate() {
        let globals_set: BTreeSet<VarId> = globals.iter().flat_map(Term::vars).collect();
        let local_vars: BTreeSet<VarId> = element.vars().difference(&globals_set).cloned().collect();
        let mut locals = vars_to_terms(&local_vars);
        let mut args = Vec::with_capacity(locals.len() + globals.len());
        args.append(&mut locals);
        args.extend(globals.iter().cloned());
        let elem_head = PredLiteral::new(elem_symbol_name('\u{3c7}', reference, elem_id), args);
        aux.push(Statement::ChoiceElemRule(ChoiceElemRule {
            reference,
            elem_id,
            head: elem_head,
            atom: element.atom.clone(),
            globals: globals.clone(),
            body: body.with(element.condition.iter().cloned()),
        }));
    }

    NormalRule { head: base_head, body: body.clone() }
}

/// Rewrites every statement of `program`, decomposing aggregates and
/// choice constructs into their auxiliary base/element rules (spec §4.4).
/// Returns the rewritten program alongside the metadata the propagator
/// needs to reconstruct each placeholder's original literal.
pub fn rewrite_program(program: Program) -> (Program, RewriteMeta) {
    let mut counter = RefCounter::new();
    let mut statements = Vec::with_capacity(program.statements.len());
    let mut meta = RewriteMeta::default();

    for stmt in program.statements {
        match stmt {
            Statement::NormalRule(r) => {
                let outer = r.head.vars();
                let body = rewrite_aggregates(&r.body, &outer, &mut counter, &mut statements, &mut meta);
                statements.push(Statement::NormalRule(NormalRule { head: r.head, body }));
            }
            Statement::DisjunctiveRule(r) => {
                let outer: BTreeSet<VarId> = r.head.iter().flat_map(PredLiteral::vars).collect();
                let body = rewrite_aggregates(&r.body, &outer, &mut counter, &mut statements, &mut meta);
                statements.push(Statement::DisjunctiveRule(crate::statement::DisjunctiveRule { head: r.head, body }));
            }
            Statement::Constraint(c) => {
                let body = rewrite_aggregates(&c.body, &BTreeSet::new(), &mut counter, &mut statements, &mut meta);
                statements.push(Statement::Constraint(Constraint { body }));
            }
            Statement::WeakConstraint(w) => {
                let mut outer = w.weight.vars();
                outer.extend(w.level.vars());
                outer.extend(w.terms.iter().flat_map(Term::vars));
                let body = rewrite_aggregates(&w.body, &outer, &mut counter, &mut statements, &mut meta);
                statements.push(Statement::WeakConstraint(WeakConstraint { body, weight: w.weight, level: w.level, terms: w.terms }));
            }
            Statement::ChoiceRule(c) => {
                let normal = rewrite_choice(&c.head, &c.body, &BTreeSet::new(), &mut counter, &mut statements, &mut meta);
                statements.push(Statement::NormalRule(normal));
            }
            other => statements.push(other),
        }
    }

    (Program { statements, query: program.query }, meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::{AggrElement, PredLiteral};
    use crate::operators::{AggrOp, RelOp};

    fn count_aggregate(guard_bound: Term) -> AggregateLiteral {
        AggregateLiteral {
            func: AggrOp::Count,
            elements: vec![AggrElement {
                terms: vec![Term::Variable("X".to_string())],
                condition: LiteralCollection::new([Literal::Pred(PredLiteral::new("p", vec![Term::Variable("X".to_string())]))]),
            }],
            left_guard: None,
            right_guard: Some(Guard::new_right(RelOp::LessOrEq, guard_bound)),
            naf: false,
        }
    }

    #[test]
    fn rewriting_aggregate_emits_base_and_element_rules() {
        let head = PredLiteral::new("h", vec![]);
        let body = LiteralCollection::new([Literal::Aggregate(count_aggregate(Term::Number(3)))]);
        let program = Program::new(vec![Statement::NormalRule(NormalRule { head, body })]);

        let (rewritten, meta) = rewrite_program(program);
        assert_eq!(rewritten.statements.len(), 3);
        assert_eq!(meta.aggregates.len(), 1);
        assert!(matches!(rewritten.statements[0], Statement::NormalRule(_)));
        assert!(matches!(rewritten.statements[1], Statement::AggrBaseRule(_)));
        assert!(matches!(rewritten.statements[2], Statement::AggrElemRule(_)));

        if let Statement::NormalRule(r) = &rewritten.statements[0] {
            assert_eq!(r.body.len(), 1);
            assert!(matches!(r.body.iter().next().unwrap(), Literal::Placeholder(Placeholder::AggrBase { .. })));
        }
    }

    #[test]
    fn element_rule_ids_are_dense_within_one_rewrite() {
        let mut aggr = count_aggregate(Term::Number(3));
        aggr.elements.push(AggrElement {
            terms: vec![Term::Variable("Y".to_string())],
            condition: LiteralCollection::new([Literal::Pred(PredLiteral::new("q", vec![Term::Variable("Y".to_string())]))]),
        });
        let body = LiteralCollection::new([Literal::Aggregate(aggr)]);
        let program = Program::new(vec![Statement::NormalRule(NormalRule { head: PredLiteral::new("h", vec![]), body })]);
        let (rewritten, _meta) = rewrite_program(program);

        let elem_ids: Vec<usize> = rewritten
            .statements
            .iter()
            .filter_map(|s| match s {
                Statement::AggrElemRule(r) => Some(r.elem_id),
                _ => None,
            })
            .collect();
        assert_eq!(elem_ids, vec![0, 1]);
    }
}
