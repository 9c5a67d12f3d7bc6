//! Literals: predicates, comparisons, aggregates, choice expressions and
//! the placeholder atoms produced by rewriting (spec §3, §4.4).
//!
//! Grounded on `ground_slash/program/literals/{literal,guard,constants}.py`
//! and `aspy/program/operators.py` (`AggrOp`).

use crate::error::InternalError;
use crate::operators::{AggrOp, RelOp};
use crate::safety::SafetyTriplet;
use crate::substitution::{match_term, Substitution};
use crate::term::{Term, VarId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Evaluates a comparison between two ground terms using the total order.
pub fn eval_rel(op: RelOp, l: &Term, r: &Term) -> Result<bool, InternalError> {
    Ok(op.eval_ordering(l.cmp_ground(r)?))
}

fn as_single_var(t: &Term) -> Option<VarId> {
    t.as_var_id()
}

/// A guard attached to an aggregate or choice expression: `op bound`,
/// always stored canonicalized to the right-hand side (spec §9 design
/// note: normalise at construction, not comparison).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guard {
    op: RelOp,
    bound: Term,
}

impl Guard {
    /// Builds a guard from a right-hand-side comparison: `value op bound`.
    pub fn new_right(op: RelOp, bound: Term) -> Self {
        Self { op, bound }
    }

    /// Builds a guard from a left-hand-side comparison: `bound op value`,
    /// canonicalized to the right-hand form.
    pub fn new_left(op: RelOp, bound: Term) -> Self {
        Self { op: op.neg(), bound }
    }

    pub fn op(&self) -> RelOp {
        self.op
    }

    pub fn bound(&self) -> &Term {
        &self.bound
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        self.bound.vars()
    }

    pub fn ground(&self) -> bool {
        self.bound.ground()
    }

    pub fn substitute(&self, subst: &Substitution) -> Guard {
        Guard { op: self.op, bound: self.bound.substitute(subst) }
    }

    /// `value op bound`.
    pub fn holds(&self, value: &Term) -> Result<bool, InternalError> {
        eval_rel(self.op, value, &self.bound)
    }

    fn safety(&self) -> SafetyTriplet {
        if self.op == RelOp::Equal {
            if let Some(var) = as_single_var(&self.bound) {
                return SafetyTriplet::safe_vars([var]);
            }
        }
        SafetyTriplet::empty()
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.bound)
    }
}

impl AggrOp {
    /// Neutral base value (spec §3: Count:0, Sum:0, Min:Supremum, Max:Infimum).
    pub fn base_value(self) -> Term {
        match self {
            AggrOp::Count => Term::Number(0),
            AggrOp::Sum => Term::Number(0),
            AggrOp::Min => Term::Supremum,
            AggrOp::Max => Term::Infimum,
        }
    }

    /// Evaluates the function on a finite multiset of element tuples
    /// (each tuple's first term is the value term for `Sum`/`Min`/`Max`).
    pub fn evaluate(self, tuples: &[Vec<Term>]) -> Term {
        match self {
            AggrOp::Count => Term::Number(tuples.len() as i64),
            AggrOp::Sum => {
                let sum: i64 = tuples.iter().filter_map(|t| t.first().and_then(|x| x.eval().ok())).sum();
                Term::Number(sum)
            }
            AggrOp::Min => tuples
                .iter()
                .filter_map(|t| t.first().cloned())
                .fold(Term::Supremum, |acc, x| if x.precedes(&acc).unwrap_or(false) { x } else { acc }),
            AggrOp::Max => tuples
                .iter()
                .filter_map(|t| t.first().cloned())
                .fold(Term::Infimum, |acc, x| if acc.precedes(&x).unwrap_or(false) { x } else { acc }),
        }
    }

    /// Monotone satisfiability check (spec §4.6): evaluates the function at
    /// the two extremes reachable between the `certain` and `possible`
    /// element multisets and accepts if either extreme satisfies both
    /// guards. `Count`/`Sum` grow monotonically from `certain` to
    /// `possible`; `Min`/`Max` move the opposite direction.
    pub fn propagate(
        self,
        guards: (Option<&Guard>, Option<&Guard>),
        certain_tuples: &[Vec<Term>],
        possible_tuples: &[Vec<Term>],
    ) -> Result<bool, InternalError> {
        let (lo, hi) = match self {
            AggrOp::Count | AggrOp::Sum => (self.evaluate(certain_tuples), self.evaluate(possible_tuples)),
            AggrOp::Min | AggrOp::Max => (self.evaluate(possible_tuples), self.evaluate(certain_tuples)),
        };

        for value in [&lo, &hi] {
            let mut ok = true;
            if let Some(g) = guards.0 {
                ok &= g.holds(value)?;
            }
            if let Some(g) = guards.1 {
                ok &= g.holds(value)?;
            }
            if ok {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// A predicate literal: `[-]name(terms...)`, possibly default-negated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PredLiteral {
    pub name: String,
    /// Classical negation (`-p(...)`).
    pub neg: bool,
    /// Negation as failure (`not p(...)`).
    pub naf: bool,
    pub terms: Vec<Term>,
}

impl PredLiteral {
    pub fn new(name: impl Into<String>, terms: Vec<Term>) -> Self {
        Self { name: name.into(), neg: false, naf: false, terms }
    }

    pub fn negated(mut self) -> Self {
        self.neg = true;
        self
    }

    pub fn with_naf(mut self) -> Self {
        self.naf = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        self.terms.iter().collect()
    }

    /// Predicate symbol including the classical-negation sign: `-p` and
    /// `p` are distinct predicates for dependency-graph purposes.
    pub fn symbol(&self) -> (String, usize) {
        let name = if self.neg { format!("-{}", self.name) } else { self.name.clone() };
        (name, self.arity())
    }

    pub fn ground(&self) -> bool {
        self.terms.iter().all(Term::ground)
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        self.terms.iter().flat_map(Term::vars).collect()
    }

    pub fn substitute(&self, subst: &Substitution) -> PredLiteral {
        PredLiteral {
            name: self.name.clone(),
            neg: self.neg,
            naf: self.naf,
            terms: self.terms.iter().map(|t| t.substitute(subst)).collect(),
        }
    }

    /// Matches this literal (as a pattern) against a ground atom of the
    /// same predicate and negation sign.
    pub fn match_atom(&self, atom: &PredLiteral) -> Option<Substitution> {
        if self.name != atom.name || self.neg != atom.neg || self.terms.len() != atom.terms.len() {
            return None;
        }
        let mut subst = Substitution::new();
        for (p, t) in self.terms.iter().zip(atom.terms.iter()) {
            let m = match_term(p, t)?;
            subst = subst.union(&m).ok()?;
        }
        Some(subst)
    }
}

impl fmt::Display for PredLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.naf {
            write!(f, "not ")?;
        }
        if self.neg {
            write!(f, "-")?;
        }
        write!(f, "{}", self.name)?;
        if !self.terms.is_empty() {
            write!(f, "(")?;
            for (i, t) in self.terms.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{t}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// A comparison built-in: `left op right`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompLiteral {
    pub op: RelOp,
    pub left: Term,
    pub right: Term,
}

impl CompLiteral {
    pub fn new(op: RelOp, left: Term, right: Term) -> Self {
        Self { op, left, right }
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        self.left.vars().into_iter().chain(self.right.vars()).collect()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        vec![&self.left, &self.right]
    }

    pub fn ground(&self) -> bool {
        self.left.ground() && self.right.ground()
    }

    pub fn substitute(&self, subst: &Substitution) -> CompLiteral {
        CompLiteral { op: self.op, left: self.left.substitute(subst), right: self.right.substitute(subst) }
    }

    pub fn eval(&self) -> Result<bool, InternalError> {
        eval_rel(self.op, &self.left, &self.right)
    }

    fn safety(&self) -> SafetyTriplet {
        // "Equal(X, term) contributes the rule X <= vars(term)"; other
        // comparisons contribute no safety.
        if self.op != RelOp::Equal {
            return SafetyTriplet::empty();
        }
        let mut triplets = Vec::new();
        if let Some(var) = as_single_var(&self.left) {
            triplets.push(SafetyTriplet::rule(var, self.right.vars()));
        }
        if let Some(var) = as_single_var(&self.right) {
            triplets.push(SafetyTriplet::rule(var, self.left.vars()));
        }
        // Left unresolved here; the enclosing `LiteralCollection`/rule
        // closure is what actually has enough context to promote these.
        SafetyTriplet { rules: triplets.into_iter().flat_map(|t| t.rules).collect(), ..SafetyTriplet::empty() }
    }
}

impl fmt::Display for CompLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.left, self.op, self.right)
    }
}

/// One element of an aggregate: `terms : conditions`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggrElement {
    pub terms: Vec<Term>,
    pub condition: LiteralCollection,
}

impl AggrElement {
    pub fn vars(&self) -> BTreeSet<VarId> {
        self.terms.iter().flat_map(Term::vars).chain(self.condition.vars()).collect()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        self.terms.iter().chain(self.condition.all_terms()).collect()
    }

    pub fn substitute(&self, subst: &Substitution) -> AggrElement {
        AggrElement {
            terms: self.terms.iter().map(|t| t.substitute(subst)).collect(),
            condition: self.condition.substitute(subst),
        }
    }
}

/// `#func{ elements } [left_guard] [right_guard]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateLiteral {
    pub func: AggrOp,
    pub elements: Vec<AggrElement>,
    pub left_guard: Option<Guard>,
    pub right_guard: Option<Guard>,
    pub naf: bool,
}

impl AggregateLiteral {
    pub fn guards(&self) -> (Option<&Guard>, Option<&Guard>) {
        (self.left_guard.as_ref(), self.right_guard.as_ref())
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut vars: BTreeSet<VarId> =
            self.left_guard.iter().flat_map(Guard::vars).chain(self.right_guard.iter().flat_map(Guard::vars)).collect();
        for e in &self.elements {
            vars.extend(e.vars());
        }
        vars
    }

    /// Global variables: those appearing outside the elements (guards
    /// only, since the grounder's rewrite pass is the one responsible for
    /// separating locals from globals within an element).
    pub fn guard_vars(&self) -> BTreeSet<VarId> {
        self.left_guard.iter().flat_map(Guard::vars).chain(self.right_guard.iter().flat_map(Guard::vars)).collect()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        let mut terms: Vec<&Term> = self.left_guard.iter().map(Guard::bound).collect();
        terms.extend(self.right_guard.iter().map(Guard::bound));
        for e in &self.elements {
            terms.extend(e.all_terms());
        }
        terms
    }

    pub fn ground(&self) -> bool {
        self.left_guard.as_ref().map(Guard::ground).unwrap_or(true)
            && self.right_guard.as_ref().map(Guard::ground).unwrap_or(true)
            && self.elements.iter().all(|e| e.terms.iter().all(Term::ground) && e.condition.ground())
    }

    pub fn substitute(&self, subst: &Substitution) -> AggregateLiteral {
        AggregateLiteral {
            func: self.func,
            elements: self.elements.iter().map(|e| e.substitute(subst)).collect(),
            left_guard: self.left_guard.as_ref().map(|g| g.substitute(subst)),
            right_guard: self.right_guard.as_ref().map(|g| g.substitute(subst)),
            naf: self.naf,
        }
    }

    fn safety(&self) -> SafetyTriplet {
        let mut triplets = Vec::new();
        if let Some(g) = &self.left_guard {
            triplets.push(g.safety());
        }
        if let Some(g) = &self.right_guard {
            triplets.push(g.safety());
        }
        SafetyTriplet::closure(triplets.iter())
    }
}

/// One element of a choice expression: an atom plus its condition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceElement {
    pub atom: PredLiteral,
    pub condition: LiteralCollection,
}

impl ChoiceElement {
    pub fn vars(&self) -> BTreeSet<VarId> {
        self.atom.vars().into_iter().chain(self.condition.vars()).collect()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        self.atom.all_terms().into_iter().chain(self.condition.all_terms()).collect()
    }

    pub fn substitute(&self, subst: &Substitution) -> ChoiceElement {
        ChoiceElement { atom: self.atom.substitute(subst), condition: self.condition.substitute(subst) }
    }
}

/// `l { elements } u` (choice construct, head-only).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceExprLiteral {
    pub elements: Vec<ChoiceElement>,
    pub left_guard: Option<Guard>,
    pub right_guard: Option<Guard>,
}

impl ChoiceExprLiteral {
    pub fn guards(&self) -> (Option<&Guard>, Option<&Guard>) {
        (self.left_guard.as_ref(), self.right_guard.as_ref())
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        let mut vars: BTreeSet<VarId> =
            self.left_guard.iter().flat_map(Guard::vars).chain(self.right_guard.iter().flat_map(Guard::vars)).collect();
        for e in &self.elements {
            vars.extend(e.vars());
        }
        vars
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        let mut terms: Vec<&Term> = self.left_guard.iter().map(Guard::bound).collect();
        terms.extend(self.right_guard.iter().map(Guard::bound));
        for e in &self.elements {
            terms.extend(e.all_terms());
        }
        terms
    }

    pub fn substitute(&self, subst: &Substitution) -> ChoiceExprLiteral {
        ChoiceExprLiteral {
            elements: self.elements.iter().map(|e| e.substitute(subst)).collect(),
            left_guard: self.left_guard.as_ref().map(|g| g.substitute(subst)),
            right_guard: self.right_guard.as_ref().map(|g| g.substitute(subst)),
        }
    }
}

/// Auxiliary placeholder atoms emitted by aggregate/choice rewriting
/// (spec §4.4), plus the two nullary constants used during simplification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placeholder {
    /// `ε_ref(globals)`: witnesses that the aggregate's neutral base value
    /// already satisfies the guards.
    AggrBase { reference: u64, atom: PredLiteral },
    /// `η_ref_elem(locals, globals)`: witnesses existence of one element.
    AggrElem { reference: u64, elem_id: usize, atom: PredLiteral },
    ChoiceBase { reference: u64, atom: PredLiteral },
    ChoiceElem { reference: u64, elem_id: usize, atom: PredLiteral },
    TrueConst,
    FalseConst,
}

impl Placeholder {
    /// The wrapped atom, for the four base/element-carrying variants; `None`
    /// for the `TrueConst`/`FalseConst` nullary markers.
    pub fn atom(&self) -> Option<&PredLiteral> {
        match self {
            Placeholder::AggrBase { atom, .. }
            | Placeholder::AggrElem { atom, .. }
            | Placeholder::ChoiceBase { atom, .. }
            | Placeholder::ChoiceElem { atom, .. } => Some(atom),
            Placeholder::TrueConst | Placeholder::FalseConst => None,
        }
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        self.atom().map(PredLiteral::vars).unwrap_or_default()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        self.atom().map(PredLiteral::all_terms).unwrap_or_default()
    }

    pub fn ground(&self) -> bool {
        self.atom().map(PredLiteral::ground).unwrap_or(true)
    }

    pub fn substitute(&self, subst: &Substitution) -> Placeholder {
        match self {
            Placeholder::AggrBase { reference, atom } => {
                Placeholder::AggrBase { reference: *reference, atom: atom.substitute(subst) }
            }
            Placeholder::AggrElem { reference, elem_id, atom } => {
                Placeholder::AggrElem { reference: *reference, elem_id: *elem_id, atom: atom.substitute(subst) }
            }
            Placeholder::ChoiceBase { reference, atom } => {
                Placeholder::ChoiceBase { reference: *reference, atom: atom.substitute(subst) }
            }
            Placeholder::ChoiceElem { reference, elem_id, atom } => {
                Placeholder::ChoiceElem { reference: *reference, elem_id: *elem_id, atom: atom.substitute(subst) }
            }
            Placeholder::TrueConst => Placeholder::TrueConst,
            Placeholder::FalseConst => Placeholder::FalseConst,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placeholder::TrueConst => write!(f, "#true"),
            Placeholder::FalseConst => write!(f, "#false"),
            _ => write!(f, "{}", self.atom().unwrap()),
        }
    }
}

/// A literal: predicate, comparison, aggregate, choice expression or
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Literal {
    Pred(PredLiteral),
    Comp(CompLiteral),
    Aggregate(AggregateLiteral),
    ChoiceExpr(ChoiceExprLiteral),
    Placeholder(Placeholder),
}

impl Literal {
    pub fn vars(&self) -> BTreeSet<VarId> {
        match self {
            Literal::Pred(p) => p.vars(),
            Literal::Comp(c) => c.vars(),
            Literal::Aggregate(a) => a.vars(),
            Literal::ChoiceExpr(c) => c.vars(),
            Literal::Placeholder(p) => p.vars(),
        }
    }

    pub fn ground(&self) -> bool {
        match self {
            Literal::Pred(p) => p.ground(),
            Literal::Comp(c) => c.ground(),
            Literal::Aggregate(a) => a.ground(),
            Literal::ChoiceExpr(_) => true, // head-only; not grounded via body matching
            Literal::Placeholder(p) => p.ground(),
        }
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        match self {
            Literal::Pred(p) => p.all_terms(),
            Literal::Comp(c) => c.all_terms(),
            Literal::Aggregate(a) => a.all_terms(),
            Literal::ChoiceExpr(c) => c.all_terms(),
            Literal::Placeholder(p) => p.all_terms(),
        }
    }

    pub fn substitute(&self, subst: &Substitution) -> Literal {
        match self {
            Literal::Pred(p) => Literal::Pred(p.substitute(subst)),
            Literal::Comp(c) => Literal::Comp(c.substitute(subst)),
            Literal::Aggregate(a) => Literal::Aggregate(a.substitute(subst)),
            Literal::ChoiceExpr(c) => Literal::ChoiceExpr(c.substitute(subst)),
            Literal::Placeholder(p) => Literal::Placeholder(p.substitute(subst)),
        }
    }

    /// Per-literal safety contribution (spec §4.2).
    pub fn safety(&self) -> SafetyTriplet {
        match self {
            Literal::Pred(p) if !p.naf => SafetyTriplet::safe_vars(p.vars()),
            Literal::Pred(p) => SafetyTriplet::unsafe_vars(p.vars()),
            Literal::Comp(c) => c.safety(),
            Literal::Aggregate(a) => a.safety(),
            Literal::ChoiceExpr(_) => SafetyTriplet::empty(),
            Literal::Placeholder(p @ (Placeholder::AggrBase { .. }
            | Placeholder::AggrElem { .. }
            | Placeholder::ChoiceBase { .. }
            | Placeholder::ChoiceElem { .. })) => SafetyTriplet::safe_vars(p.vars()),
            Literal::Placeholder(_) => SafetyTriplet::empty(),
        }
    }

    pub fn is_false_const(&self) -> bool {
        matches!(self, Literal::Placeholder(Placeholder::FalseConst))
    }

    pub fn is_true_const(&self) -> bool {
        matches!(self, Literal::Placeholder(Placeholder::TrueConst))
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Pred(p) => write!(f, "{p}"),
            Literal::Comp(c) => write!(f, "{c}"),
            Literal::Aggregate(a) => {
                if let Some(g) = &a.left_guard {
                    write!(f, "{g} ")?;
                }
                write!(f, "{}{{", a.func)?;
                for (i, e) in a.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, "{}", e.terms.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(","))?;
                }
                write!(f, "}}")?;
                if let Some(g) = &a.right_guard {
                    write!(f, " {g}")?;
                }
                Ok(())
            }
            Literal::ChoiceExpr(c) => {
                if let Some(g) = &c.left_guard {
                    write!(f, "{g} ")?;
                }
                write!(f, "{{")?;
                for (i, e) in c.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ";")?;
                    }
                    write!(f, "{}", e.atom)?;
                }
                write!(f, "}}")?;
                if let Some(g) = &c.right_guard {
                    write!(f, " {g}")?;
                }
                Ok(())
            }
            Literal::Placeholder(p) => write!(f, "{p}"),
        }
    }
}

/// Order-preserving, deduplicated, set-equal collection of literals
/// (spec §3: "Every body is a LiteralCollection").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LiteralCollection {
    literals: Vec<Literal>,
}

impl LiteralCollection {
    pub fn new(literals: impl IntoIterator<Item = Literal>) -> Self {
        let mut seen = Vec::new();
        for lit in literals {
            if !seen.contains(&lit) {
                seen.push(lit);
            }
        }
        Self { literals: seen }
    }

    pub fn empty() -> Self {
        Self { literals: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    pub fn as_slice(&self) -> &[Literal] {
        &self.literals
    }

    pub fn ground(&self) -> bool {
        self.literals.iter().all(Literal::ground)
    }

    pub fn vars(&self) -> BTreeSet<VarId> {
        self.literals.iter().flat_map(Literal::vars).collect()
    }

    pub fn all_terms(&self) -> Vec<&Term> {
        self.literals.iter().flat_map(Literal::all_terms).collect()
    }

    pub fn safety(&self) -> SafetyTriplet {
        SafetyTriplet::closure(self.literals.iter().map(Literal::safety).collect::<Vec<_>>().iter())
    }

    pub fn substitute(&self, subst: &Substitution) -> LiteralCollection {
        LiteralCollection::new(self.literals.iter().map(|l| l.substitute(subst)))
    }

    /// A new collection without the given literals.
    pub fn without(&self, exclude: &[Literal]) -> LiteralCollection {
        LiteralCollection::new(self.literals.iter().filter(|l| !exclude.contains(l)).cloned())
    }

    pub fn with(&self, extra: impl IntoIterator<Item = Literal>) -> LiteralCollection {
        LiteralCollection::new(self.literals.iter().cloned().chain(extra))
    }
}

impl PartialEq for LiteralCollection {
    fn eq(&self, other: &Self) -> bool {
        self.literals.len() == other.literals.len()
            && self.literals.iter().all(|l| other.literals.contains(l))
    }
}
impl Eq for LiteralCollection {}

impl std::hash::Hash for LiteralCollection {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // hash as the frozen multiset: sum of independently hashed members
        // is order-independent (spec §3, §9: "hashes and compares as a
        // multiset").
        use std::hash::Hasher;
        let mut acc: u64 = 0;
        for lit in &self.literals {
            let mut h = std::collections::hash_map::DefaultHasher::new();
            lit.hash(&mut h);
            acc ^= h.finish();
        }
        state.write_u64(acc);
    }
}

impl fmt::Display for LiteralCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, l) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{l}")?;
        }
        Ok(())
    }
}

impl FromIterator<Literal> for LiteralCollection {
    fn from_iter<I: IntoIterator<Item = Literal>>(iter: I) -> Self {
        LiteralCollection::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_equality_is_side_flip_invariant() {
        let a = Guard::new_right(RelOp::GreaterOrEq, Term::Number(3));
        let b = Guard::new_left(RelOp::LessOrEq, Term::Number(3));
        assert_eq!(a, b);
    }

    #[test]
    fn literal_collection_equality_is_set_equality() {
        let a = PredLiteral::new("p", vec![Term::Number(1)]);
        let b = PredLiteral::new("q", vec![Term::Number(2)]);
        let lc1 = LiteralCollection::new([Literal::Pred(a.clone()), Literal::Pred(b.clone())]);
        let lc2 = LiteralCollection::new([Literal::Pred(b), Literal::Pred(a)]);
        assert_eq!(lc1, lc2);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut h1 = DefaultHasher::new();
        lc1.hash(&mut h1);
        let mut h2 = DefaultHasher::new();
        lc2.hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn literal_collection_deduplicates() {
        let p = PredLiteral::new("p", vec![Term::Number(1)]);
        let lc = LiteralCollection::new([Literal::Pred(p.clone()), Literal::Pred(p)]);
        assert_eq!(lc.len(), 1);
    }

    #[test]
    fn naf_literal_is_unsafe_unless_bound_elsewhere() {
        let naf = Literal::Pred(PredLiteral::new("q", vec![Term::Variable("X".into())]).with_naf());
        let triplet = naf.safety();
        assert!(triplet.unsafe_vars.contains(&VarId::Named("X".to_string())));
    }

    #[test]
    fn count_propagate_accepts_when_within_range() {
        let guard = Guard::new_right(RelOp::LessOrEq, Term::Number(3));
        let certain = vec![vec![Term::Number(1)], vec![Term::Number(2)]];
        let possible = certain.clone();
        let ok = AggrOp::Count.propagate((Some(&guard), None), &certain, &possible).unwrap();
        assert!(ok);

        let guard_tight = Guard::new_right(RelOp::LessOrEq, Term::Number(1));
        let rejected = AggrOp::Count.propagate((Some(&guard_tight), None), &certain, &possible).unwrap();
        assert!(!rejected);
    }

    #[test]
    fn aggregate_base_values_match_spec() {
        assert_eq!(AggrOp::Count.base_value(), Term::Number(0));
        assert_eq!(AggrOp::Sum.base_value(), Term::Number(0));
        assert_eq!(AggrOp::Min.base_value(), Term::Supremum);
        assert_eq!(AggrOp::Max.base_value(), Term::Infimum);
    }
}
