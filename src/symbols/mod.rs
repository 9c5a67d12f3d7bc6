//! Predicate dependency graph, EDB/IDB partition and component graph
//! construction (spec §4.3).
//!
//! Grounded on `aspy/grounder/{component_graph,scc,edb_idb}.py`: nodes are
//! predicate symbols with arity, edges are tagged positive/negative by
//! whether the contributing body occurrence is default-negated.

pub mod component;
pub mod scc;

use crate::literal::{Literal, LiteralCollection, PredLiteral};
use crate::statement::{Program, Statement};
use component::{Component, ComponentGraph};
use std::collections::{BTreeMap, BTreeSet};

/// A predicate symbol: name plus arity.
pub type Predicate = (String, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgePolarity {
    Positive,
    Negative,
}

/// Predicate-level dependency graph (spec §4.3): `p -> q` for every body
/// predicate `p` and head predicate `q` of the same rule.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub predicates: Vec<Predicate>,
    index: BTreeMap<Predicate, usize>,
    /// `(body_predicate_index, head_predicate_index, polarity, rule_index)`.
    pub edges: Vec<(usize, usize, EdgePolarity, usize)>,
}

impl DependencyGraph {
    pub fn from_program(program: &Program) -> Self {
        let mut graph = DependencyGraph::default();
        for stmt in &program.statements {
            for head in stmt.head_atoms() {
                graph.intern(head.symbol());
            }
            for (pred, _) in body_predicate_occurrences(&stmt.body()) {
                graph.intern(pred);
            }
        }

        for (rule_idx, stmt) in program.statements.iter().enumerate() {
            let heads: Vec<Predicate> = stmt.head_atoms().iter().map(PredLiteral::symbol).collect();
            if heads.is_empty() {
                continue;
            }
            for (pred, naf) in body_predicate_occurrences(&stmt.body()) {
                let polarity = if naf { EdgePolarity::Negative } else { EdgePolarity::Positive };
                let from = *graph.index.get(&pred).unwrap();
                for head in &heads {
                    let to = *graph.index.get(head).unwrap();
                    graph.edges.push((from, to, polarity, rule_idx));
                }
            }
        }

        graph
    }

    fn intern(&mut self, pred: Predicate) -> usize {
        if let Some(&idx) = self.index.get(&pred) {
            return idx;
        }
        let idx = self.predicates.len();
        self.index.insert(pred.clone(), idx);
        self.predicates.push(pred);
        idx
    }

    /// EDB/IDB partition (spec §4.3): EDB predicates are never the head of
    /// a non-fact rule (including predicates with no defining rule at
    /// all); IDB predicates have at least one.
    pub fn edb_idb(&self, program: &Program) -> (BTreeSet<Predicate>, BTreeSet<Predicate>) {
        let mut has_rule_head: BTreeSet<Predicate> = BTreeSet::new();
        for stmt in &program.statements {
            if stmt.body().is_empty() {
                continue;
            }
            for head in stmt.head_atoms() {
                has_rule_head.insert(head.symbol());
            }
        }
        let idb: BTreeSet<Predicate> = self.predicates.iter().filter(|p| has_rule_head.contains(*p)).cloned().collect();
        let edb: BTreeSet<Predicate> = self.predicates.iter().filter(|p| !has_rule_head.contains(*p)).cloned().collect();
        (edb, idb)
    }

    /// Computes the component graph (spec §4.3): Tarjan-SCC over the
    /// predicate graph, then rule classification and stratification per
    /// component.
    pub fn component_graph(&self, program: &Program) -> ComponentGraph {
        let n = self.predicates.len();
        let edge_pairs: Vec<(usize, usize)> = self.edges.iter().map(|&(from, to, _, _)| (from, to)).collect();
        let sccs = scc::tarjan_scc(n, &edge_pairs);

        let mut pred_component: BTreeMap<usize, usize> = BTreeMap::new();
        for (comp_idx, members) in sccs.iter().enumerate() {
            for &m in members {
                pred_component.insert(m, comp_idx);
            }
        }

        let mut components: Vec<Component> = sccs
            .iter()
            .map(|members| Component {
                predicates: members.iter().map(|&i| self.predicates[i].clone()).collect(),
                exit_rules: Vec::new(),
                recursive_rules: Vec::new(),
                stratified: true,
            })
            .collect();

        let mut inter_edges: BTreeSet<(usize, usize)> = BTreeSet::new();
        for &(from, to, polarity, _) in &self.edges {
            let from_comp = pred_component[&from];
            let to_comp = pred_component[&to];
            if from_comp == to_comp {
                if polarity == EdgePolarity::Negative {
                    components[to_comp].stratified = false;
                }
            } else {
                inter_edges.insert((from_comp, to_comp));
            }
        }

        for (rule_idx, stmt) in program.statements.iter().enumerate() {
            let heads: Vec<Predicate> = stmt.head_atoms().iter().map(PredLiteral::symbol).collect();
            let Some(head) = heads.first() else { continue };
            let Some(&head_idx) = self.index.get(head) else { continue };
            let head_comp = pred_component[&head_idx];

            let body_preds = body_predicate_occurrences(&stmt.body());
            let is_recursive = body_preds
                .iter()
                .any(|(pred, _)| self.index.get(pred).map(|&idx| pred_component[&idx] == head_comp).unwrap_or(false));

            if is_recursive {
                components[head_comp].recursive_rules.push(rule_idx);
            } else {
                components[head_comp].exit_rules.push(rule_idx);
            }
        }

        ComponentGraph { components, edges: inter_edges }
    }
}

/// Collects every predicate literal occurring in a body, including inside
/// aggregate elements' and choice elements' conditions, tagged with
/// whether the occurrence is negation-as-failure.
fn body_predicate_occurrences(body: &LiteralCollection) -> Vec<(Predicate, bool)> {
    let mut out = Vec::new();
    for lit in body.iter() {
        collect_pred_occurrences(lit, &mut out);
    }
    out
}

fn collect_pred_occurrences(lit: &Literal, out: &mut Vec<(Predicate, bool)>) {
    match lit {
        Literal::Pred(p) => out.push((p.symbol(), p.naf)),
        Literal::Aggregate(a) => {
            for e in &a.elements {
                for l in e.condition.iter() {
                    collect_pred_occurrences(l, out);
                }
            }
        }
        Literal::ChoiceExpr(c) => {
            for e in &c.elements {
                for l in e.condition.iter() {
                    collect_pred_occurrences(l, out);
                }
            }
        }
        Literal::Comp(_) | Literal::Placeholder(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::literal::PredLiteral;
    use crate::statement::NormalRule;
    use crate::term::Term;

    fn fact(name: &str) -> Statement {
        Statement::NormalRule(NormalRule { head: PredLiteral::new(name, vec![]), body: LiteralCollection::empty() })
    }

    fn rule(head: &str, body_pred: &str, naf: bool) -> Statement {
        let mut p = PredLiteral::new(body_pred, vec![]);
        if naf {
            p = p.with_naf();
        }
        Statement::NormalRule(NormalRule {
            head: PredLiteral::new(head, vec![]),
            body: LiteralCollection::new([Literal::Pred(p)]),
        })
    }

    #[test]
    fn edb_idb_classifies_facts_as_edb() {
        let program = Program::new(vec![fact("base"), rule("derived", "base", false)]);
        let graph = DependencyGraph::from_program(&program);
        let (edb, idb) = graph.edb_idb(&program);
        assert!(edb.contains(&("base".to_string(), 0)));
        assert!(idb.contains(&("derived".to_string(), 0)));
    }

    #[test]
    fn cyclic_component_is_unstratified_with_negative_edge() {
        let program = Program::new(vec![rule("p", "q", true), rule("q", "p", false)]);
        let graph = DependencyGraph::from_program(&program);
        let components = graph.component_graph(&program);
        assert_eq!(components.components.len(), 1);
        assert!(!components.components[0].stratified);
    }

    #[test]
    fn acyclic_rules_split_into_separate_components() {
        let program = Program::new(vec![fact("a"), rule("b", "a", false), rule("c", "b", false)]);
        let graph = DependencyGraph::from_program(&program);
        let components = graph.component_graph(&program);
        assert_eq!(components.components.len(), 3);
        let order = components.topological_order();
        assert_eq!(order.len(), 3);
    }

    #[test]
    fn exit_rule_vs_recursive_rule_classification() {
        let base_atom = PredLiteral::new("base", vec![Term::Variable("X".into())]);
        let p_atom = PredLiteral::new("p", vec![Term::Variable("X".into())]);
        let program = Program::new(vec![
            Statement::NormalRule(NormalRule { head: base_atom.clone(), body: LiteralCollection::empty() }),
            Statement::NormalRule(NormalRule {
                head: p_atom.clone(),
                body: LiteralCollection::new([Literal::Pred(base_atom)]),
            }),
            Statement::NormalRule(NormalRule {
                head: p_atom.clone(),
                body: LiteralCollection::new([Literal::Pred(p_atom)]),
            }),
        ]);
        let graph = DependencyGraph::from_program(&program);
        let components = graph.component_graph(&program);
        let p_comp = components
            .components
            .iter()
            .find(|c| c.predicates.contains(&("p".to_string(), 1)))
            .unwrap();
        assert_eq!(p_comp.exit_rules.len(), 1);
        assert_eq!(p_comp.recursive_rules.len(), 1);
    }
}
