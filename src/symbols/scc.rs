//! Tarjan's strongly-connected-components algorithm, iterative to avoid
//! deep recursion on large dependency graphs (spec §4.3).

/// Computes the strongly connected components of a graph with `n` nodes
/// (indices `0..n`) and the given directed edges. Returns components in
/// reverse topological order of the condensation (a component with only
/// outgoing edges to earlier components comes first), matching Tarjan's
/// natural output order.
pub fn tarjan_scc(n: usize, edges: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    for &(from, to) in edges {
        adj[from].push(to);
    }

    let mut index_counter = 0usize;
    let mut indices: Vec<Option<usize>> = vec![None; n];
    let mut lowlink: Vec<usize> = vec![0; n];
    let mut on_stack: Vec<bool> = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut result: Vec<Vec<usize>> = Vec::new();

    // Explicit work-stack frames for the iterative DFS: a node plus the
    // index of the next neighbor to visit.
    enum Frame {
        Enter(usize),
        Finish(usize, usize),
    }

    for start in 0..n {
        if indices[start].is_some() {
            continue;
        }
        let mut work: Vec<Frame> = vec![Frame::Enter(start)];
        while let Some(frame) = work.pop() {
            match frame {
                Frame::Enter(v) => {
                    if indices[v].is_some() {
                        continue;
                    }
                    indices[v] = Some(index_counter);
                    lowlink[v] = index_counter;
                    index_counter += 1;
                    stack.push(v);
                    on_stack[v] = true;
                    work.push(Frame::Finish(v, 0));
                }
                Frame::Finish(v, next_idx) => {
                    if next_idx < adj[v].len() {
                        let w = adj[v][next_idx];
                        work.push(Frame::Finish(v, next_idx + 1));
                        if indices[w].is_none() {
                            work.push(Frame::Enter(w));
                        } else if on_stack[w] {
                            lowlink[v] = lowlink[v].min(indices[w].unwrap());
                        }
                        continue;
                    }
                    // All neighbors processed; propagate lowlink to parent
                    // and, if `v` is a component root, pop it off.
                    if let Some(&Frame::Finish(parent, _)) = work.last() {
                        lowlink[parent] = lowlink[parent].min(lowlink[v]);
                    }
                    if lowlink[v] == indices[v].unwrap() {
                        let mut component = Vec::new();
                        loop {
                            let w = stack.pop().unwrap();
                            on_stack[w] = false;
                            component.push(w);
                            if w == v {
                                break;
                            }
                        }
                        result.push(component);
                    }
                }
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_no_edges_is_its_own_component() {
        let sccs = tarjan_scc(1, &[]);
        assert_eq!(sccs, vec![vec![0]]);
    }

    #[test]
    fn cycle_collapses_into_one_component() {
        let sccs = tarjan_scc(3, &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(sccs.len(), 1);
        let mut members = sccs[0].clone();
        members.sort();
        assert_eq!(members, vec![0, 1, 2]);
    }

    #[test]
    fn dag_yields_one_component_per_node() {
        let sccs = tarjan_scc(3, &[(0, 1), (1, 2)]);
        assert_eq!(sccs.len(), 3);
    }

    #[test]
    fn two_separate_cycles_stay_distinct() {
        let sccs = tarjan_scc(4, &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        assert_eq!(sccs.len(), 2);
    }
}
