//! Component-ordered semi-naive instantiation (spec §4.5, §4.8).
//!
//! Grounded on `aspy/grounder/grounder.py`'s `instantiate`/`instantiate_module`
//! skeleton: exit rules of a component fire once against the atoms derived by
//! earlier components, recursive rules iterate to a fixpoint, and components
//! run in the dependency graph's topological order.

pub mod select;

use crate::error::InternalError;
use crate::literal::{Literal, LiteralCollection, Placeholder, PredLiteral};
use crate::statement::{
    AggrBaseRule, AggrElemRule, ChoiceBaseRule, ChoiceElemRule, Constraint, DisjunctiveRule, NPPRule, NormalRule, OptimizeElement,
    OptimizeStatement, Program, Statement, WeakConstraint,
};
use crate::substitution::Substitution;
use crate::symbols::component::ComponentGraph;
use crate::term::{Term, VarId};
use rayon::prelude::*;
use std::collections::BTreeSet;

/// Bookkeeping returned alongside the ground program (spec §7's ambient
/// logging: exposed so the pipeline can report it at `--verbose`).
#[derive(Debug, Clone, Default)]
pub struct GroundingStats {
    pub components: usize,
    pub iterations: usize,
    pub ground_rules: usize,
    pub atoms: usize,
}

/// A safety valve against non-terminating recursive components (should
/// never trigger for a stratified, safety-checked program; guards against
/// an internal bug rather than a user-facing limit).
const DEFAULT_MAX_ITERATIONS_PER_COMPONENT: usize = 10_000;

/// Tunables for a single instantiation run, set from [`crate::pipeline::GroundOptions`].
#[derive(Debug, Clone, Copy)]
pub struct InstantiateOptions {
    /// Fan out a component's independent exit rules across threads via rayon.
    pub parallel: bool,
    /// Fixpoint safety valve per recursive component.
    pub max_iterations: usize,
}

impl Default for InstantiateOptions {
    fn default() -> Self {
        Self { parallel: true, max_iterations: DEFAULT_MAX_ITERATIONS_PER_COMPONENT }
    }
}

/// Runs the instantiation loop over an already-rewritten program (i.e. one
/// that has already gone through [`crate::rewrite::rewrite_program`]).
/// Returns the set of ground statements (including the auxiliary
/// `AggrBaseRule`/`AggrElemRule`/`ChoiceBaseRule`/`ChoiceElemRule`
/// instances the propagator still needs to consume) plus the final
/// reachable-atom set and component stats.
pub fn instantiate_program(
    program: &Program,
    components: &ComponentGraph,
    options: InstantiateOptions,
) -> Result<(Vec<Statement>, BTreeSet<PredLiteral>, GroundingStats), InternalError> {
    let order = components.topological_order();
    let mut atoms: BTreeSet<PredLiteral> = BTreeSet::new();
    let mut ground_rules: Vec<Statement> = Vec::new();
    let mut stats = GroundingStats { components: order.len(), ..GroundingStats::default() };

    for comp_idx in order {
        let component = &components.components[comp_idx];

        // Exit rules of a component never reference one of the component's
        // own predicates (that's what makes them "exit" rather than
        // "recursive"), so each only reads the snapshot of `atoms` already
        // finalized by earlier components and can be instantiated
        // independently of its siblings.
        let exit_results: Vec<(Vec<Statement>, Vec<PredLiteral>)> = if options.parallel {
            component
                .exit_rules
                .par_iter()
                .map(|&rule_idx| instantiate_rule(&program.statements[rule_idx], &atoms, &atoms))
                .collect::<Result<_, _>>()?
        } else {
            component
                .exit_rules
                .iter()
                .map(|&rule_idx| instantiate_rule(&program.statements[rule_idx], &atoms, &atoms))
                .collect::<Result<_, _>>()?
        };
        for (instances, new_atoms) in exit_results {
            ground_rules.extend(instances);
            atoms.extend(new_atoms);
        }

        let mut iterations = 0;
        loop {
            iterations += 1;
            if iterations > options.max_iterations {
                return Err(InternalError::new(format!(
                    "component {comp_idx} did not reach a fixpoint within {} iterations",
                    options.max_iterations
                )));
            }
            let snapshot = atoms.clone();
            let mut new_atoms: BTreeSet<PredLiteral> = BTreeSet::new();
            let mut round_instances = Vec::new();
            for &rule_idx in &component.recursive_rules {
                // Positive binders match against `possible`, which grows
                // within the round so later rules in the same pass can
                // already see earlier rules' new derivations — that's what
                // makes this semi-naive rather than naive (spec §4.5 step
                // 2). NAF literals instead check against `certain`
                // (`snapshot`, the round's starting point): an atom only
                // derived earlier in THIS round is still merely possible,
                // not proven, so it must not be able to prune a sibling
                // rule's negated literal within the same round (otherwise
                // an odd cycle through negation collapses onto whichever
                // rule happens to be declared first, instead of grounding
                // both rules the way a solver would expect to see them).
                let probe: BTreeSet<PredLiteral> = snapshot.union(&new_atoms).cloned().collect();
                let (instances, found) = instantiate_rule(&program.statements[rule_idx], &probe, &snapshot)?;
                round_instances.extend(instances);
                new_atoms.extend(found);
            }
            stats.iterations += 1;
            if new_atoms.is_subset(&atoms) {
                ground_rules.extend(round_instances);
                break;
            }
            atoms.extend(new_atoms);
            // Ground instances from a non-final round are superseded by
            // the next round's (since later rounds see strictly more
            // atoms); only the converged round's instances are kept.
        }
    }

    // Constraints, weak constraints and optimize statements have no head
    // (`Statement::head_atoms()` returns an empty `Vec` for all three), so
    // they never contribute an edge to the dependency graph and never land
    // in any component's `exit_rules`/`recursive_rules` — nothing above
    // ever instantiates them. Ground them here in one final pass against
    // the fully-converged `atoms` set, once every component (and thus
    // every predicate this program can derive) has settled.
    for stmt in &program.statements {
        if !stmt.head_atoms().is_empty() {
            continue;
        }
        let (instances, _) = instantiate_rule(stmt, &atoms, &atoms)?;
        ground_rules.extend(instances.into_iter().map(|inst| match inst {
            Statement::Constraint(c) => Statement::Constraint(Constraint { body: drop_trivially_true(c.body, &atoms) }),
            other => other,
        }));
    }

    stats.ground_rules = ground_rules.len();
    stats.atoms = atoms.len();
    Ok((ground_rules, atoms, stats))
}

/// Drops body literals already proven true by grounding (spec §4.5 step 4):
/// a positive, non-NAF `Pred` literal that matched a member of `atoms` to be
/// instantiated in the first place is trivially true, and a constraint's
/// body carries no head to preserve those bindings for — so it's dropped
/// rather than kept for documentation purposes the way a normal rule's body
/// is. An all-true body therefore empties out, which `collect_warnings`
/// (spec §4.5 step 4's other half) reports as an inconsistency.
fn drop_trivially_true(body: LiteralCollection, atoms: &BTreeSet<PredLiteral>) -> LiteralCollection {
    LiteralCollection::new(body.iter().filter(|lit| !is_trivially_true(lit, atoms)).cloned())
}

fn is_trivially_true(lit: &Literal, atoms: &BTreeSet<PredLiteral>) -> bool {
    match lit {
        Literal::Pred(p) if !p.naf => atoms.contains(p),
        Literal::Placeholder(Placeholder::TrueConst) => true,
        _ => false,
    }
}

/// Instantiates every ground substitution satisfying `stmt`'s body,
/// returning the resulting ground statement instances plus every new head
/// atom they derive. `possible` is matched against for positive binders;
/// `certain` is what NAF literals are checked against (spec §4.5 step 2:
/// NAF fails iff the atom is in `certain`, not merely `possible`) — the two
/// coincide once a set of atoms has fully converged (e.g. for exit rules,
/// or for the final headless-statement pass), but differ mid-round inside a
/// recursive component's fixpoint loop.
fn instantiate_rule(
    stmt: &Statement,
    possible: &BTreeSet<PredLiteral>,
    certain: &BTreeSet<PredLiteral>,
) -> Result<(Vec<Statement>, Vec<PredLiteral>), InternalError> {
    let body_literals: Vec<Literal> = stmt.body().iter().cloned().collect();
    let all_terms: Vec<Term> = stmt.all_terms().into_iter().cloned().collect();

    let mut substs = Vec::new();
    ground_body(&body_literals, Substitution::new(), possible, certain, &all_terms, &mut substs)?;

    let mut ground_instances = Vec::with_capacity(substs.len());
    let mut new_atoms = Vec::new();
    for subst in substs {
        let ground_stmt = substitute_statement(stmt, &subst);
        new_atoms.extend(ground_stmt.head_atoms());
        ground_instances.push(ground_stmt);
    }
    Ok((ground_instances, new_atoms))
}

/// Backtracking search over the remaining body literals: at each step,
/// selects the next literal per [`select::select_literal`], either
/// branching over every matching candidate atom (for a positive binder) or
/// checking/filtering a single ready literal, accumulating every
/// successful full substitution into `results`.
fn ground_body(
    remaining: &[Literal],
    subst: Substitution,
    possible: &BTreeSet<PredLiteral>,
    certain: &BTreeSet<PredLiteral>,
    all_terms: &[Term],
    results: &mut Vec<Substitution>,
) -> Result<(), InternalError> {
    if remaining.is_empty() {
        results.push(subst);
        return Ok(());
    }

    let substituted: Vec<Literal> = remaining.iter().map(|l| l.substitute(&subst)).collect();
    let Some(idx) = select::select_literal(&substituted) else {
        // Nothing ready: a safe, stratified program should never reach
        // this for a fully-processed body; treat as a dead branch rather
        // than panicking on an upstream invariant this function cannot
        // itself enforce.
        return Ok(());
    };
    let rest: Vec<Literal> = remaining.iter().enumerate().filter(|&(i, _)| i != idx).map(|(_, l)| l.clone()).collect();

    match &substituted[idx] {
        Literal::Pred(p) if !p.naf => {
            for candidate in possible.iter().filter(|a| a.name == p.name && a.neg == p.neg && a.terms.len() == p.terms.len()) {
                if let Some(m) = p.match_atom(candidate) {
                    let Ok(extended) = subst.union(&m) else { continue };
                    let extended = resolve_arith_vars(all_terms, extended);
                    ground_body(&rest, extended, possible, certain, all_terms, results)?;
                }
            }
        }
        Literal::Placeholder(ph) if ph.atom().is_some() => {
            let pattern = ph.atom().unwrap();
            for candidate in possible.iter().filter(|a| a.name == pattern.name && a.terms.len() == pattern.terms.len()) {
                if let Some(m) = pattern.match_atom(candidate) {
                    let Ok(extended) = subst.union(&m) else { continue };
                    let extended = resolve_arith_vars(all_terms, extended);
                    ground_body(&rest, extended, possible, certain, all_terms, results)?;
                }
            }
        }
        Literal::Pred(p) => {
            // Ground NAF literal: holds iff its positive form is not
            // already certain (not merely possible).
            let probe = PredLiteral { name: p.name.clone(), neg: p.neg, naf: false, terms: p.terms.clone() };
            if !certain.contains(&probe) {
                ground_body(&rest, subst, possible, certain, all_terms, results)?;
            }
        }
        Literal::Comp(c) => {
            if let Some((var, value)) = select::assignable_var(c) {
                let value = value.simplify().map_err(|e| InternalError::new(e.to_string()))?;
                let mut m = Substitution::new();
                if m.bind(var, value).is_ok() {
                    if let Ok(extended) = subst.union(&m) {
                        let extended = resolve_arith_vars(all_terms, extended);
                        ground_body(&rest, extended, possible, certain, all_terms, results)?;
                    }
                }
            } else if c.eval()? {
                ground_body(&rest, subst, possible, certain, all_terms, results)?;
            }
        }
        Literal::Placeholder(Placeholder::TrueConst) => ground_body(&rest, subst, possible, certain, all_terms, results)?,
        Literal::Placeholder(Placeholder::FalseConst) => {}
        Literal::Aggregate(_) | Literal::ChoiceExpr(_) => {
            return Err(InternalError::new("aggregate/choice literal survived rewriting into the instantiation loop"));
        }
    }
    Ok(())
}

/// Extends `subst` with every arithmetic variable (anywhere in the
/// statement) whose source expression has become fully ground, to a
/// fixpoint (an arithmetic variable's expression may itself mention
/// another arithmetic variable).
fn resolve_arith_vars(all_terms: &[Term], mut subst: Substitution) -> Substitution {
    loop {
        let mut changed = false;
        for term in all_terms {
            walk_bind(term, &mut subst, &mut changed);
        }
        if !changed {
            return subst;
        }
    }
}

fn walk_bind(term: &Term, subst: &mut Substitution, changed: &mut bool) {
    match term {
        Term::ArithVariable(id, expr) => {
            if subst.get(&VarId::Arith(*id)).is_none() {
                let substituted = expr.substitute(subst);
                if substituted.ground() {
                    if let Ok(value) = substituted.simplify() {
                        if subst.bind(VarId::Arith(*id), value).is_ok() {
                            *changed = true;
                        }
                    }
                }
            }
            walk_bind(expr, subst, changed);
        }
        Term::Functional(_, args) => {
            for a in args {
                walk_bind(a, subst, changed);
            }
        }
        Term::Arith(_, l, r) => {
            walk_bind(l, subst, changed);
            walk_bind(r, subst, changed);
        }
        Term::Minus(x) => walk_bind(x, subst, changed),
        _ => {}
    }
}

/// Builds the fully-substituted ground statement. The body is kept (not
/// discarded) since downstream consumers (the propagator, and ultimately a
/// solver) still need to see the ground literals a rule's derivation
/// depended on, not just its head.
fn substitute_statement(stmt: &Statement, subst: &Substitution) -> Statement {
    match stmt {
        Statement::NormalRule(r) => Statement::NormalRule(NormalRule { head: r.head.substitute(subst), body: r.body.substitute(subst) }),
        Statement::DisjunctiveRule(r) => Statement::DisjunctiveRule(DisjunctiveRule {
            head: r.head.iter().map(|h| h.substitute(subst)).collect(),
            body: r.body.substitute(subst),
        }),
        Statement::ChoiceRule(r) => {
            Statement::ChoiceRule(crate::statement::ChoiceRule { head: r.head.substitute(subst), body: r.body.substitute(subst) })
        }
        Statement::Constraint(c) => Statement::Constraint(Constraint { body: c.body.substitute(subst) }),
        Statement::WeakConstraint(w) => Statement::WeakConstraint(WeakConstraint {
            body: w.body.substitute(subst),
            weight: w.weight.substitute(subst),
            level: w.level.substitute(subst),
            terms: w.terms.iter().map(|t| t.substitute(subst)).collect(),
        }),
        Statement::OptimizeStatement(opt) => Statement::OptimizeStatement(OptimizeStatement {
            maximize: opt.maximize,
            elements: opt
                .elements
                .iter()
                .map(|e| OptimizeElement {
                    weight: e.weight.substitute(subst),
                    level: e.level.substitute(subst),
                    terms: e.terms.iter().map(|t| t.substitute(subst)).collect(),
                    condition: e.condition.substitute(subst),
                })
                .collect(),
        }),
        Statement::NPPRule(r) => Statement::NPPRule(NPPRule {
            name: r.name.clone(),
            terms: r.terms.iter().map(|t| t.substitute(subst)).collect(),
            outcomes: r.outcomes.iter().map(|t| t.substitute(subst)).collect(),
            body: r.body.substitute(subst),
        }),
        Statement::AggrBaseRule(r) => Statement::AggrBaseRule(AggrBaseRule {
            reference: r.reference,
            head: r.head.substitute(subst),
            globals: r.globals.iter().map(|t| t.substitute(subst)).collect(),
            body: r.body.substitute(subst),
        }),
        Statement::AggrElemRule(r) => Statement::AggrElemRule(AggrElemRule {
            reference: r.reference,
            elem_id: r.elem_id,
            head: r.head.substitute(subst),
            values: r.values.iter().map(|t| t.substitute(subst)).collect(),
            globals: r.globals.iter().map(|t| t.substitute(subst)).collect(),
            body: r.body.substitute(subst),
        }),
        Statement::ChoiceBaseRule(r) => Statement::ChoiceBaseRule(ChoiceBaseRule {
            reference: r.reference,
            head: r.head.substitute(subst),
            globals: r.globals.iter().map(|t| t.substitute(subst)).collect(),
            body: r.body.substitute(subst),
        }),
        Statement::ChoiceElemRule(r) => Statement::ChoiceElemRule(ChoiceElemRule {
            reference: r.reference,
            elem_id: r.elem_id,
            head: r.head.substitute(subst),
            atom: r.atom.substitute(subst),
            globals: r.globals.iter().map(|t| t.substitute(subst)).collect(),
            body: r.body.substitute(subst),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::{LiteralCollection, PredLiteral};
    use crate::operators::RelOp;
    use crate::rewrite::rewrite_program;
    use crate::symbols::DependencyGraph;

    fn fact(name: &str, terms: Vec<Term>) -> Statement {
        Statement::NormalRule(NormalRule { head: PredLiteral::new(name, terms), body: LiteralCollection::empty() })
    }

    #[test]
    fn instantiates_facts_with_no_body() {
        let stmt = fact("a", vec![Term::Number(1)]);
        let (instances, atoms) = instantiate_rule(&stmt, &BTreeSet::new(), &BTreeSet::new()).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(atoms, vec![PredLiteral::new("a", vec![Term::Number(1)])]);
    }

    #[test]
    fn binds_variable_from_positive_body_literal() {
        let stmt = Statement::NormalRule(NormalRule {
            head: PredLiteral::new("q", vec![Term::Variable("X".to_string())]),
            body: LiteralCollection::new([Literal::Pred(PredLiteral::new("p", vec![Term::Variable("X".to_string())]))]),
        });
        let mut atoms = BTreeSet::new();
        atoms.insert(PredLiteral::new("p", vec![Term::Number(1)]));
        atoms.insert(PredLiteral::new("p", vec![Term::Number(2)]));
        let (instances, new_atoms) = instantiate_rule(&stmt, &atoms, &atoms).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(new_atoms.len(), 2);
    }

    #[test]
    fn naf_literal_prunes_branch_when_atom_present() {
        let stmt = Statement::NormalRule(NormalRule {
            head: PredLiteral::new("q", vec![Term::Number(1)]),
            body: LiteralCollection::new([Literal::Pred(PredLiteral::new("p", vec![Term::Number(1)]).with_naf())]),
        });
        let mut atoms = BTreeSet::new();
        atoms.insert(PredLiteral::new("p", vec![Term::Number(1)]));
        let (instances, _) = instantiate_rule(&stmt, &atoms, &atoms).unwrap();
        assert!(instances.is_empty());
    }

    #[test]
    fn equality_assigns_unbound_variable() {
        let stmt = Statement::NormalRule(NormalRule {
            head: PredLiteral::new("q", vec![Term::Variable("X".to_string())]),
            body: LiteralCollection::new([Literal::Comp(crate::literal::CompLiteral::new(
                RelOp::Equal,
                Term::Variable("X".to_string()),
                Term::Number(7),
            ))]),
        });
        let (instances, new_atoms) = instantiate_rule(&stmt, &BTreeSet::new(), &BTreeSet::new()).unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(new_atoms, vec![PredLiteral::new("q", vec![Term::Number(7)])]);
    }

    #[test]
    fn full_program_reaches_fixpoint_across_components() {
        let program = Program::new(vec![
            fact("edge", vec![Term::SymConst("a".to_string()), Term::SymConst("b".to_string())]),
            fact("edge", vec![Term::SymConst("b".to_string()), Term::SymConst("c".to_string())]),
            Statement::NormalRule(NormalRule {
                head: PredLiteral::new("reach", vec![Term::Variable("X".to_string()), Term::Variable("Y".to_string())]),
                body: LiteralCollection::new([Literal::Pred(PredLiteral::new(
                    "edge",
                    vec![Term::Variable("X".to_string()), Term::Variable("Y".to_string())],
                ))]),
            }),
            Statement::NormalRule(NormalRule {
                head: PredLiteral::new("reach", vec![Term::Variable("X".to_string()), Term::Variable("Z".to_string())]),
                body: LiteralCollection::new([
                    Literal::Pred(PredLiteral::new("reach", vec![Term::Variable("X".to_string()), Term::Variable("Y".to_string())])),
                    Literal::Pred(PredLiteral::new("edge", vec![Term::Variable("Y".to_string()), Term::Variable("Z".to_string())])),
                ]),
            }),
        ]);

        let (rewritten, _meta) = rewrite_program(program);
        let dep_graph = DependencyGraph::from_program(&rewritten);
        let components = dep_graph.component_graph(&rewritten);
        let (_ground, atoms, stats) = instantiate_program(&rewritten, &components, InstantiateOptions::default()).unwrap();

        assert!(atoms.contains(&PredLiteral::new(
            "reach",
            vec![Term::SymConst("a".to_string()), Term::SymConst("c".to_string())]
        )));
        assert!(stats.iterations >= 1);
    }
}
