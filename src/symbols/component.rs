//! The component graph: SCCs of the dependency graph, each tagged with its
//! defining rules and stratification, ordered into a topological
//! instantiation order (spec §4.3).

use super::Predicate;
use std::collections::{BTreeSet, VecDeque};

/// One strongly connected component of predicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub predicates: BTreeSet<Predicate>,
    /// Indices into `Program.statements` whose head is in this component
    /// and whose body refers only to earlier components.
    pub exit_rules: Vec<usize>,
    /// Indices into `Program.statements` whose head and (at least some)
    /// body predicate are both in this component.
    pub recursive_rules: Vec<usize>,
    /// True iff no edge internal to this component is negative.
    pub stratified: bool,
}

/// Components as nodes, with edges (of either polarity) between distinct
/// components induced by the underlying dependency graph.
#[derive(Debug, Clone, Default)]
pub struct ComponentGraph {
    pub components: Vec<Component>,
    pub edges: BTreeSet<(usize, usize)>,
}

impl ComponentGraph {
    /// A topological order over components (spec §4.3). The underlying
    /// graph is acyclic by construction (inter-SCC edges never cycle back),
    /// so this always succeeds; any leftover nodes after Kahn's algorithm
    /// terminates would indicate an internal inconsistency upstream.
    pub fn topological_order(&self) -> Vec<usize> {
        let n = self.components.len();
        let mut indegree = vec![0usize; n];
        for &(_, to) in &self.edges {
            indegree[to] += 1;
        }
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(from, to) in &self.edges {
            adj[from].push(to);
        }

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &next in &adj[node] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(names: &[&str]) -> Component {
        Component {
            predicates: names.iter().map(|n| (n.to_string(), 0)).collect(),
            exit_rules: Vec::new(),
            recursive_rules: Vec::new(),
            stratified: true,
        }
    }

    #[test]
    fn topological_order_respects_edges() {
        let graph = ComponentGraph {
            components: vec![component(&["a"]), component(&["b"]), component(&["c"])],
            edges: [(0, 1), (1, 2)].into_iter().collect(),
        };
        let order = graph.topological_order();
        let pos = |i: usize| order.iter().position(|&x| x == i).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn disconnected_components_all_appear() {
        let graph = ComponentGraph {
            components: vec![component(&["a"]), component(&["b"])],
            edges: BTreeSet::new(),
        };
        assert_eq!(graph.topological_order().len(), 2);
    }
}
