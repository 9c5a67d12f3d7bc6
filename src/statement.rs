//! Statements and programs (spec §3), plus the rule-level safety check.
//!
//! Grounded on `ground_slash/program/statements/*.py` for the rule shapes
//! and `aspy/grounder/edb_idb.py` for how a program's predicates are
//! classified.

use crate::error::{SafetyError, StatementLocation};
use crate::literal::{ChoiceExprLiteral, LiteralCollection, PredLiteral};
use crate::safety::SafetyTriplet;
use crate::term::{Term, VarId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalRule {
    pub head: PredLiteral,
    pub body: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisjunctiveRule {
    pub head: Vec<PredLiteral>,
    pub body: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceRule {
    pub head: ChoiceExprLiteral,
    pub body: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub body: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakConstraint {
    pub body: LiteralCollection,
    pub weight: Term,
    pub level: Term,
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeElement {
    pub weight: Term,
    pub level: Term,
    pub terms: Vec<Term>,
    pub condition: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizeStatement {
    pub maximize: bool,
    pub elements: Vec<OptimizeElement>,
}

/// `#npp(name(terms), outcomes) :- body.` — expands into a disjunctive
/// rule over `name(terms..., outcome_j)` (spec §4.7); the grounder treats
/// it as exactly that, no probabilistic semantics apply here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NPPRule {
    pub name: String,
    pub terms: Vec<Term>,
    pub outcomes: Vec<Term>,
    pub body: LiteralCollection,
}

impl NPPRule {
    pub fn expand_head_atoms(&self) -> Vec<PredLiteral> {
        self.outcomes
            .iter()
            .map(|o| {
                let mut terms = self.terms.clone();
                terms.push(o.clone());
                PredLiteral::new(self.name.clone(), terms)
            })
            .collect()
    }
}

/// Auxiliary rule emitted by rewriting an aggregate's guards (spec §4.4):
/// `εα_ref(globals) :- guard_comparison, rule.body \ {A}.`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggrBaseRule {
    pub reference: u64,
    pub head: PredLiteral,
    /// The rule's global variables, grounded alongside `head` (for a base
    /// rule these coincide with `head.terms`, kept as its own field so the
    /// propagator can group base/element instances uniformly).
    pub globals: Vec<Term>,
    pub body: LiteralCollection,
}

/// Auxiliary rule emitted per aggregate element (spec §4.4):
/// `ηα_ref_i(locals_i, globals) :- e_i.conditions, rule.body \ {A}.`
///
/// `values` carries the element's original value tuple (spec §3's
/// `Placeholder::AggrElem(ref, elem_id, locals, globals, values)`) — kept
/// alongside (not folded into) `head`'s locals/globals args, since the
/// propagator needs the element's actual term values for `Sum`/`Min`/`Max`,
/// which need not coincide with the variables used to key existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggrElemRule {
    pub reference: u64,
    pub elem_id: usize,
    pub head: PredLiteral,
    pub values: Vec<Term>,
    pub globals: Vec<Term>,
    pub body: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceBaseRule {
    pub reference: u64,
    pub head: PredLiteral,
    pub globals: Vec<Term>,
    pub body: LiteralCollection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceElemRule {
    pub reference: u64,
    pub elem_id: usize,
    pub head: PredLiteral,
    /// The element's original atom (spec's `l { p(X) : ... } u` elements),
    /// kept alongside `head` so the propagator can assemble the ground
    /// `Choice` literal's elements without re-deriving the atom from the
    /// element rule's body.
    pub atom: PredLiteral,
    pub globals: Vec<Term>,
    pub body: LiteralCollection,
}

/// A single statement of a program (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    NormalRule(NormalRule),
    DisjunctiveRule(DisjunctiveRule),
    ChoiceRule(ChoiceRule),
    Constraint(Constraint),
    WeakConstraint(WeakConstraint),
    OptimizeStatement(OptimizeStatement),
    NPPRule(NPPRule),
    AggrBaseRule(AggrBaseRule),
    AggrElemRule(AggrElemRule),
    ChoiceBaseRule(ChoiceBaseRule),
    ChoiceElemRule(ChoiceElemRule),
}

/// Textual rendering following the dialect's concrete syntax (spec §6),
/// for diagnostics/debugging only — this crate has no concrete-syntax
/// parser to round-trip it back through.
impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self.body();
        match self {
            Statement::NormalRule(r) if body.is_empty() => write!(f, "{}.", r.head),
            Statement::NormalRule(r) => write!(f, "{} :- {}.", r.head, body),
            Statement::DisjunctiveRule(r) => {
                let heads: Vec<String> = r.head.iter().map(PredLiteral::to_string).collect();
                write!(f, "{} :- {}.", heads.join(" | "), body)
            }
            Statement::ChoiceRule(r) => write!(f, "{} :- {}.", r.head, body),
            Statement::Constraint(_) => write!(f, ":- {}.", body),
            Statement::WeakConstraint(r) => write!(f, ":- {}. [{}@{}]", body, r.weight, r.level),
            Statement::OptimizeStatement(opt) => {
                let kind = if opt.maximize { "#maximize" } else { "#minimize" };
                write!(f, "{kind}{{")?;
                for (i, e) in opt.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, "{}@{}:{}", e.weight, e.level, e.condition)?;
                }
                write!(f, "}}.")
            }
            Statement::NPPRule(r) => {
                let outcomes: Vec<String> = r.outcomes.iter().map(Term::to_string).collect();
                let args: Vec<String> = r.terms.iter().map(Term::to_string).collect();
                write!(f, "#npp({}({}), {{{}}}) :- {}.", r.name, args.join(","), outcomes.join(","), body)
            }
            Statement::AggrBaseRule(r) => write!(f, "{} :- {}.", r.head, r.body),
            Statement::AggrElemRule(r) => write!(f, "{} :- {}.", r.head, r.body),
            Statement::ChoiceBaseRule(r) => write!(f, "{} :- {}.", r.head, r.body),
            Statement::ChoiceElemRule(r) => write!(f, "{} :- {}.", r.head, r.body),
        }
    }
}

impl Statement {
    /// The statement's body. Optimize statements have one condition per
    /// element rather than a single body; this returns their union so
    /// callers that only care about aggregate safety/dependency
    /// contributions can treat every statement uniformly.
    pub fn body(&self) -> LiteralCollection {
        match self {
            Statement::NormalRule(r) => r.body.clone(),
            Statement::DisjunctiveRule(r) => r.body.clone(),
            Statement::ChoiceRule(r) => r.body.clone(),
            Statement::Constraint(r) => r.body.clone(),
            Statement::WeakConstraint(r) => r.body.clone(),
            Statement::NPPRule(r) => r.body.clone(),
            Statement::AggrBaseRule(r) => r.body.clone(),
            Statement::AggrElemRule(r) => r.body.clone(),
            Statement::ChoiceBaseRule(r) => r.body.clone(),
            Statement::ChoiceElemRule(r) => r.body.clone(),
            Statement::OptimizeStatement(opt) => opt
                .elements
                .iter()
                .fold(LiteralCollection::empty(), |acc, e| acc.with(e.condition.iter().cloned())),
        }
    }

    /// Head atoms contributing outgoing edges to the dependency graph
    /// (spec §4.3). Constraints, weak constraints and optimize statements
    /// have no head predicate.
    pub fn head_atoms(&self) -> Vec<PredLiteral> {
        match self {
            Statement::NormalRule(r) => vec![r.head.clone()],
            Statement::DisjunctiveRule(r) => r.head.clone(),
            Statement::ChoiceRule(r) => r.head.elements.iter().map(|e| e.atom.clone()).collect(),
            Statement::NPPRule(r) => r.expand_head_atoms(),
            Statement::AggrBaseRule(r) => vec![r.head.clone()],
            Statement::AggrElemRule(r) => vec![r.head.clone()],
            Statement::ChoiceBaseRule(r) => vec![r.head.clone()],
            Statement::ChoiceElemRule(r) => vec![r.head.clone()],
            Statement::Constraint(_) | Statement::WeakConstraint(_) | Statement::OptimizeStatement(_) => Vec::new(),
        }
    }

    /// Variables required to be safe: every variable occurring in the head
    /// (or, for optimize statements, in an optimize element's terms), plus
    /// every arithmetic variable occurring anywhere in the statement
    /// (spec §4.2's `closure` only walks body literals, but arithmetic
    /// variables minted from head terms still need their source-expression
    /// rule to participate).
    fn required_vars(&self) -> BTreeSet<VarId> {
        let mut required: BTreeSet<VarId> = self.head_atoms().iter().flat_map(PredLiteral::vars).collect();
        if let Statement::OptimizeStatement(opt) = self {
            for e in &opt.elements {
                required.extend(e.weight.vars());
                required.extend(e.level.vars());
                required.extend(e.terms.iter().flat_map(Term::vars));
            }
        }
        if let Statement::WeakConstraint(w) = self {
            required.extend(w.weight.vars());
            required.extend(w.level.vars());
            required.extend(w.terms.iter().flat_map(Term::vars));
        }
        required
    }

    /// Every term appearing anywhere in the statement (head and body), used
    /// to harvest arithmetic-variable safety rules and, during
    /// instantiation, to resolve arithmetic variables as their source
    /// expressions become ground.
    pub(crate) fn all_terms(&self) -> Vec<&Term> {
        let mut terms: Vec<&Term> = self.body().all_terms();
        match self {
            Statement::NormalRule(r) => terms.extend(r.head.all_terms()),
            Statement::DisjunctiveRule(r) => terms.extend(r.head.iter().flat_map(PredLiteral::all_terms)),
            Statement::ChoiceRule(r) => terms.extend(r.head.all_terms()),
            Statement::WeakConstraint(w) => {
                terms.push(&w.weight);
                terms.push(&w.level);
                terms.extend(w.terms.iter());
            }
            Statement::OptimizeStatement(opt) => {
                for e in &opt.elements {
                    terms.push(&e.weight);
                    terms.push(&e.level);
                    terms.extend(e.terms.iter());
                    terms.extend(e.condition.all_terms());
                }
            }
            Statement::NPPRule(r) => {
                terms.extend(r.terms.iter());
                terms.extend(r.outcomes.iter());
            }
            Statement::AggrBaseRule(r) => {
                terms.extend(r.head.all_terms());
                terms.extend(r.globals.iter());
            }
            Statement::AggrElemRule(r) => {
                terms.extend(r.head.all_terms());
                terms.extend(r.values.iter());
                terms.extend(r.globals.iter());
            }
            Statement::ChoiceBaseRule(r) => {
                terms.extend(r.head.all_terms());
                terms.extend(r.globals.iter());
            }
            Statement::ChoiceElemRule(r) => {
                terms.extend(r.head.all_terms());
                terms.extend(r.atom.all_terms());
                terms.extend(r.globals.iter());
            }
            Statement::Constraint(_) => {}
        }
        terms
    }

    /// Checks whether this statement is safe (spec §4.2): the closure over
    /// the body's literal triplets, plus every arithmetic-variable rule
    /// harvested from the whole statement, must leave every required
    /// variable safe.
    pub fn check_safety(&self, location: StatementLocation) -> Result<(), SafetyError> {
        let mut triplets = vec![self.body().safety()];
        for rule in collect_arith_rules(self.all_terms()) {
            triplets.push(rule);
        }
        let combined = SafetyTriplet::closure(triplets.iter());

        let required = self.required_vars();
        let unsafe_vars: BTreeSet<VarId> = required.difference(&combined.safe).cloned().collect();
        if unsafe_vars.is_empty() {
            Ok(())
        } else {
            Err(SafetyError { location, unsafe_vars: unsafe_vars.into_iter().map(|v| v.to_string()).collect() })
        }
    }
}

fn collect_arith_rules(terms: Vec<&Term>) -> Vec<SafetyTriplet> {
    let mut rules = Vec::new();
    for term in terms {
        walk_arith(term, &mut rules);
    }
    rules
}

fn walk_arith(term: &Term, out: &mut Vec<SafetyTriplet>) {
    match term {
        Term::ArithVariable(id, expr) => {
            out.push(SafetyTriplet::rule(VarId::Arith(*id), expr.vars()));
            walk_arith(expr, out);
        }
        Term::Functional(_, args) => {
            for a in args {
                walk_arith(a, out);
            }
        }
        Term::Arith(_, l, r) => {
            walk_arith(l, out);
            walk_arith(r, out);
        }
        Term::Minus(x) => walk_arith(x, out),
        _ => {}
    }
}

/// An optional query posed against the program (spec §3: "a tuple of
/// statements plus an optional query").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub atom: PredLiteral,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Statement>,
    pub query: Option<Query>,
}

impl Program {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements, query: None }
    }

    pub fn with_query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Every predicate symbol `(name, arity)` occurring as a head anywhere
    /// in the program.
    pub fn head_predicates(&self) -> BTreeSet<(String, usize)> {
        self.statements.iter().flat_map(|s| s.head_atoms()).map(|a| a.symbol()).collect()
    }

    /// Checks safety of every statement, collecting every offender rather
    /// than stopping at the first.
    pub fn check_safety(&self) -> Result<(), crate::error::SafetyErrors> {
        let errors: Vec<_> = self
            .statements
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.check_safety(StatementLocation::new(i)).err())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(crate::error::SafetyErrors(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::Literal;
    use crate::operators::{ArithOp, RelOp};

    fn head_only_rule(name: &str, var: &str) -> Statement {
        Statement::NormalRule(NormalRule {
            head: PredLiteral::new(name, vec![Term::Variable(var.to_string())]),
            body: LiteralCollection::empty(),
        })
    }

    #[test]
    fn head_var_with_empty_body_is_unsafe() {
        let stmt = head_only_rule("head", "X");
        assert!(stmt.check_safety(StatementLocation::new(0)).is_err());
    }

    #[test]
    fn head_var_bound_by_positive_body_is_safe() {
        let stmt = Statement::NormalRule(NormalRule {
            head: PredLiteral::new("h", vec![Term::Variable("X".to_string())]),
            body: LiteralCollection::new([Literal::Pred(PredLiteral::new("p", vec![Term::Variable("X".to_string())]))]),
        });
        assert!(stmt.check_safety(StatementLocation::new(0)).is_ok());
    }

    #[test]
    fn arithmetic_variable_in_head_is_safe_once_source_is_safe() {
        let x = Term::Variable("X".to_string());
        let arith_var = Term::ArithVariable(0, Box::new(Term::Arith(ArithOp::Plus, Box::new(x.clone()), Box::new(Term::Number(1)))));
        let stmt = Statement::NormalRule(NormalRule {
            head: PredLiteral::new("h", vec![arith_var]),
            body: LiteralCollection::new([Literal::Pred(PredLiteral::new("p", vec![x]))]),
        });
        assert!(stmt.check_safety(StatementLocation::new(0)).is_ok());
    }

    #[test]
    fn equal_comparison_chains_safety_through_closure() {
        let x = Term::Variable("X".to_string());
        let y = Term::Variable("Y".to_string());
        let stmt = Statement::NormalRule(NormalRule {
            head: PredLiteral::new("h", vec![y.clone()]),
            body: LiteralCollection::new([
                Literal::Pred(PredLiteral::new("p", vec![x.clone()])),
                Literal::Comp(crate::literal::CompLiteral::new(RelOp::Equal, y, x)),
            ]),
        });
        assert!(stmt.check_safety(StatementLocation::new(0)).is_ok());
    }

    #[test]
    fn npp_rule_expands_to_disjunction_of_outcomes() {
        let npp = NPPRule {
            name: "flip".to_string(),
            terms: vec![Term::SymConst("coin".to_string())],
            outcomes: vec![Term::SymConst("heads".to_string()), Term::SymConst("tails".to_string())],
            body: LiteralCollection::empty(),
        };
        let atoms = npp.expand_head_atoms();
        assert_eq!(atoms.len(), 2);
        assert_eq!(atoms[0].terms.len(), 2);
    }

    #[test]
    fn program_collects_safety_errors_from_every_statement() {
        let program = Program::new(vec![head_only_rule("a", "X"), head_only_rule("b", "Y")]);
        let err = program.check_safety().unwrap_err();
        assert_eq!(err.0.len(), 2);
    }
}
