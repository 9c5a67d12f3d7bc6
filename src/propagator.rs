//! Propagator: reconstructs aggregate/choice literals from their ground
//! base/element rule decomposition (spec §4.6).
//!
//! Grounded on `ground_slash/grounding/propagation/{aggregates,choice}.py`,
//! which consume exactly this placeholder/base/element shape: ground
//! instances are grouped by `(ref, globals)`, the aggregate function's
//! `propagate` decides satisfiability, and the placeholder occurrence in
//! the real rule is swapped for the reassembled literal (or `FalseConst`).

use crate::error::InternalError;
use crate::literal::{AggrElement, AggregateLiteral, ChoiceElement, ChoiceExprLiteral, Literal, LiteralCollection, Placeholder, PredLiteral};
use crate::rewrite::RewriteMeta;
use crate::statement::{
    ChoiceRule, Constraint, DisjunctiveRule, NPPRule, NormalRule, OptimizeElement, OptimizeStatement, Statement, WeakConstraint,
};
use crate::substitution::Substitution;
use crate::term::Term;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct PropagationStats {
    pub aggregate_groups: usize,
    pub choice_groups: usize,
    pub discarded: usize,
}

#[derive(Debug, Default)]
struct AggrGroup {
    values: Vec<Vec<Term>>,
}

#[derive(Debug, Default)]
struct ChoiceGroup {
    atoms: Vec<PredLiteral>,
}

/// Consumes a grounder's ground statement list, folding the auxiliary
/// base/element rule instances into aggregate/choice groups and
/// reassembling the real rules that referenced them (spec §4.6).
pub fn propagate_program(ground: Vec<Statement>, meta: &RewriteMeta) -> Result<(Vec<Statement>, PropagationStats), InternalError> {
    let mut aggr_groups: BTreeMap<(u64, Vec<Term>), AggrGroup> = BTreeMap::new();
    let mut choice_groups: BTreeMap<(u64, Vec<Term>), ChoiceGroup> = BTreeMap::new();
    let mut real: Vec<Statement> = Vec::with_capacity(ground.len());

    for stmt in ground {
        match stmt {
            // The base rule's existence is already implied by its head
            // atom reaching the AggrBase placeholder occurrence below; it
            // carries no extra information once grouped, so only its
            // `(reference, globals)` key is needed.
            Statement::AggrBaseRule(r) => {
                aggr_groups.entry((r.reference, r.globals)).or_default();
            }
            Statement::AggrElemRule(r) => {
                aggr_groups.entry((r.reference, r.globals)).or_default().values.push(r.values);
            }
            Statement::ChoiceBaseRule(r) => {
                choice_groups.entry((r.reference, r.globals)).or_default();
            }
            Statement::ChoiceElemRule(r) => {
                choice_groups.entry((r.reference, r.globals)).or_default().atoms.push(r.atom);
            }
            other => real.push(other),
        }
    }

    // Choice constructs replace the whole statement with a marker
    // `NormalRule` headed by the χ_ref(globals) atom (rewrite.rs's
    // `rewrite_choice`); recognize those by symbol name.
    let choice_markers: BTreeMap<String, u64> = meta.choices.keys().map(|&reference| (choice_marker_name(reference), reference)).collect();

    let mut stats = PropagationStats { aggregate_groups: aggr_groups.len(), choice_groups: choice_groups.len(), discarded: 0 };
    let mut assembled = Vec::with_capacity(real.len());

    for stmt in real {
        if let Statement::NormalRule(r) = &stmt {
            if let Some(&reference) = choice_markers.get(&r.head.name) {
                let ground_literal = assemble_choice(reference, &r.head.terms, meta, choice_groups.get(&(reference, r.head.terms.clone())));
                assembled.push(Statement::ChoiceRule(ChoiceRule { head: ground_literal, body: r.body.clone() }));
                continue;
            }
        }
        match rewrite_statement_body(stmt, &aggr_groups, meta)? {
            Some(s) => assembled.push(s),
            None => stats.discarded += 1,
        }
    }

    Ok((assembled, stats))
}

fn choice_marker_name(reference: u64) -> String {
    format!("\u{3c7}_{reference}")
}

/// Rebuilds a substitution mapping the template's globals variable terms
/// onto the ground globals values, positionally.
fn globals_subst(template: &[Term], ground: &[Term]) -> Substitution {
    let mut subst = Substitution::new();
    for (t, g) in template.iter().zip(ground.iter()) {
        if let Some(var) = t.as_var_id() {
            let _ = subst.bind(var, g.clone());
        }
    }
    subst
}

fn assemble_aggregate(reference: u64, ground_globals: &[Term], meta: &RewriteMeta, group: Option<&AggrGroup>) -> Result<Literal, InternalError> {
    let (template, globals_template) =
        meta.aggregates.get(&reference).ok_or_else(|| InternalError::new(format!("no aggregate recorded for ref {reference}")))?;
    let subst = globals_subst(globals_template, ground_globals);

    let left_guard = template.left_guard.as_ref().map(|g| g.substitute(&subst));
    let right_guard = template.right_guard.as_ref().map(|g| g.substitute(&subst));
    let guards = (left_guard.as_ref(), right_guard.as_ref());

    let tuples: Vec<Vec<Term>> = group.map(|g| g.values.clone()).unwrap_or_default();
    let satisfiable = template.func.propagate(guards, &tuples, &tuples)?;
    if !satisfiable {
        return Ok(Literal::Placeholder(Placeholder::FalseConst));
    }

    let elements = tuples.into_iter().map(|terms| AggrElement { terms, condition: LiteralCollection::empty() }).collect();
    Ok(Literal::Aggregate(AggregateLiteral { func: template.func, elements, left_guard, right_guard, naf: template.naf }))
}

fn assemble_choice(reference: u64, ground_globals: &[Term], meta: &RewriteMeta, group: Option<&ChoiceGroup>) -> ChoiceExprLiteral {
    let Some((template, globals_template)) = meta.choices.get(&reference) else {
        return ChoiceExprLiteral { elements: Vec::new(), left_guard: None, right_guard: None };
    };
    let subst = globals_subst(globals_template, ground_globals);
    let elements = group
        .map(|g| g.atoms.iter().cloned().map(|atom| ChoiceElement { atom, condition: LiteralCollection::empty() }).collect())
        .unwrap_or_default();
    ChoiceExprLiteral {
        elements,
        left_guard: template.left_guard.as_ref().map(|g| g.substitute(&subst)),
        right_guard: template.right_guard.as_ref().map(|g| g.substitute(&subst)),
    }
}

/// Replaces every `AggrBase` placeholder occurrence in `stmt`'s body with
/// its reassembled `Aggregate` literal (or drops the statement entirely if
/// any placeholder turns out unsatisfiable — spec §4.6 item 3).
fn rewrite_statement_body(
    stmt: Statement,
    aggr_groups: &BTreeMap<(u64, Vec<Term>), AggrGroup>,
    meta: &RewriteMeta,
) -> Result<Option<Statement>, InternalError> {
    let rewrite_body = |body: &LiteralCollection| -> Result<Option<LiteralCollection>, InternalError> {
        let mut out = Vec::with_capacity(body.len());
        for lit in body.iter() {
            let replaced = match lit {
                Literal::Placeholder(Placeholder::AggrBase { reference, atom }) => {
                    let group = aggr_groups.get(&(*reference, atom.terms.clone()));
                    assemble_aggregate(*reference, &atom.terms, meta, group)?
                }
                other => other.clone(),
            };
            if replaced.is_false_const() {
                return Ok(None);
            }
            if !replaced.is_true_const() {
                out.push(replaced);
            }
        }
        Ok(Some(LiteralCollection::new(out)))
    };

    Ok(match stmt {
        Statement::NormalRule(r) => match rewrite_body(&r.body)? {
            Some(body) => Some(Statement::NormalRule(NormalRule { head: r.head, body })),
            None => None,
        },
        Statement::DisjunctiveRule(r) => match rewrite_body(&r.body)? {
            Some(body) => Some(Statement::DisjunctiveRule(DisjunctiveRule { head: r.head, body })),
            None => None,
        },
        Statement::ChoiceRule(r) => match rewrite_body(&r.body)? {
            Some(body) => Some(Statement::ChoiceRule(ChoiceRule { head: r.head, body })),
            None => None,
        },
        Statement::Constraint(c) => match rewrite_body(&c.body)? {
            Some(body) => Some(Statement::Constraint(Constraint { body })),
            None => None,
        },
        Statement::WeakConstraint(w) => match rewrite_body(&w.body)? {
            Some(body) => Some(Statement::WeakConstraint(WeakConstraint { body, weight: w.weight, level: w.level, terms: w.terms })),
            None => None,
        },
        Statement::NPPRule(r) => match rewrite_body(&r.body)? {
            Some(body) => Some(Statement::NPPRule(NPPRule { name: r.name, terms: r.terms, outcomes: r.outcomes, body })),
            None => None,
        },
        Statement::OptimizeStatement(opt) => {
            let mut elements = Vec::with_capacity(opt.elements.len());
            for e in opt.elements {
                if let Some(condition) = rewrite_body(&e.condition)? {
                    elements.push(OptimizeElement { weight: e.weight, level: e.level, terms: e.terms, condition });
                }
            }
            Some(Statement::OptimizeStatement(OptimizeStatement { maximize: opt.maximize, elements }))
        }
        aux @ (Statement::AggrBaseRule(_) | Statement::AggrElemRule(_) | Statement::ChoiceBaseRule(_) | Statement::ChoiceElemRule(_)) => {
            Some(aux)
        }
    })
}
