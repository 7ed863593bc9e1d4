//! Cycle detection.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use super::{DependencyEdge, DependencyGraph};

/// A closed walk: `nodes[0] -> nodes[1] -> ... -> nodes[0]`, with the edges
/// that close it in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub nodes: Vec<String>,
    pub edges: Vec<DependencyEdge>,
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|n| n == id)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// DFS frame: a node, the edge that entered it, and the next outgoing edge
/// to try.
struct Frame {
    node: usize,
    via: Option<usize>,
    next: usize,
}

impl DependencyGraph {
    /// One cycle per back edge found by a depth-first search that starts
    /// from nodes in first-seen order and follows edges in insertion order.
    ///
    /// The search keeps an explicit stack, so deep graphs cannot overflow.
    /// Acyclic graphs give an empty list.
    pub fn find_cycles(&self) -> Vec<Cycle> {
        let mut marks = vec![Mark::Unvisited; self.node_count()];
        let mut cycles = Vec::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();

        for start in 0..self.node_count() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            let mut stack = vec![Frame {
                node: start,
                via: None,
                next: 0,
            }];
            marks[start] = Mark::OnStack;

            while let Some(frame) = stack.last_mut() {
                let node = frame.node;
                let Some(&edge) = self.outgoing_edges(node).get(frame.next) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.next += 1;

                let Some(target) = self.node_index(&self.edges[edge].target) else {
                    continue;
                };
                match marks[target] {
                    Mark::Unvisited => {
                        marks[target] = Mark::OnStack;
                        stack.push(Frame {
                            node: target,
                            via: Some(edge),
                            next: 0,
                        });
                    }
                    Mark::OnStack => {
                        let Some(from) = stack.iter().position(|f| f.node == target) else {
                            continue;
                        };
                        let members: Vec<usize> = stack[from..].iter().map(|f| f.node).collect();
                        // Parallel multi-edges would report the same walk again.
                        if !seen.insert(members.clone()) {
                            continue;
                        }
                        let mut edges: Vec<DependencyEdge> = stack[from + 1..]
                            .iter()
                            .filter_map(|f| f.via)
                            .map(|e| self.edges[e].clone())
                            .collect();
                        edges.push(self.edges[edge].clone());
                        cycles.push(Cycle {
                            nodes: members.iter().map(|&i| self.nodes[i].id.clone()).collect(),
                            edges,
                        });
                    }
                    Mark::Done => {}
                }
            }
        }

        debug!("Found {} cycles in {} nodes", cycles.len(), self.node_count());
        cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.find_cycles().is_empty()
    }

    /// Strongly connected components with more than one node, in order of
    /// their first node's position. Iterative Tarjan.
    pub fn strongly_connected_components(&self) -> Vec<Vec<String>> {
        let n = self.node_count();
        let mut index_of: Vec<Option<usize>> = vec![None; n];
        let mut lowlink = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut components: Vec<Vec<usize>> = Vec::new();
        let mut counter = 0usize;

        for root in 0..n {
            if index_of[root].is_some() {
                continue;
            }
            // (node, successors, next successor position)
            let mut work: Vec<(usize, Vec<usize>, usize)> = Vec::new();
            index_of[root] = Some(counter);
            lowlink[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;
            work.push((root, self.successors(root), 0));

            while let Some((node, successors, pos)) = work.last_mut() {
                let node = *node;
                if let Some(&next) = successors.get(*pos) {
                    *pos += 1;
                    match index_of[next] {
                        None => {
                            index_of[next] = Some(counter);
                            lowlink[next] = counter;
                            counter += 1;
                            stack.push(next);
                            on_stack[next] = true;
                            let successors = self.successors(next);
                            work.push((next, successors, 0));
                        }
                        Some(next_index) if on_stack[next] => {
                            lowlink[node] = lowlink[node].min(next_index);
                        }
                        Some(_) => {}
                    }
                    continue;
                }

                work.pop();
                if let Some((parent, _, _)) = work.last() {
                    lowlink[*parent] = lowlink[*parent].min(lowlink[node]);
                }
                if Some(lowlink[node]) == index_of[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    if component.len() > 1 {
                        components.push(component);
                    }
                }
            }
        }

        for component in &mut components {
            component.sort_unstable();
        }
        components.sort_by_key(|c| c[0]);
        components
            .into_iter()
            .map(|c| c.into_iter().map(|i| self.nodes[i].id.clone()).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::edge;
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(false);
        for (source, target) in edges {
            graph.add_edge(edge(source, target));
        }
        graph
    }

    #[test]
    fn test_triangle_has_exactly_one_cycle() {
        let graph = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let cycles = graph.find_cycles();

        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["A", "B", "C"]);
        let closing: Vec<_> = cycles[0]
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str()))
            .collect();
        assert_eq!(closing, vec![("A", "B"), ("B", "C"), ("C", "A")]);
    }

    #[test]
    fn test_acyclic_graph_has_none() {
        let graph = graph(&[("A", "B"), ("B", "C"), ("A", "C")]);
        assert!(graph.find_cycles().is_empty());
        assert!(!graph.has_cycles());
        assert!(graph.strongly_connected_components().is_empty());
    }

    #[test]
    fn test_every_cycle_is_closed_walk() {
        let graph = graph(&[
            ("a", "b"),
            ("b", "a"),
            ("b", "c"),
            ("c", "d"),
            ("d", "b"),
            ("e", "e"),
        ]);
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 2);

        for cycle in &cycles {
            assert!(cycle.len() >= 2);
            assert_eq!(cycle.edges.len(), cycle.nodes.len());
            for (i, e) in cycle.edges.iter().enumerate() {
                assert_eq!(e.source, cycle.nodes[i]);
                assert_eq!(e.target, cycle.nodes[(i + 1) % cycle.nodes.len()]);
            }
            let unique: HashSet<_> = cycle.nodes.iter().collect();
            assert_eq!(unique.len(), cycle.nodes.len());
        }
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut graph = DependencyGraph::new(false);
        for i in 0..50_000 {
            graph.add_edge(edge(&format!("m{i}"), &format!("m{}", i + 1)));
        }
        graph.add_edge(edge("m50000", "m0"));
        let cycles = graph.find_cycles();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 50_001);
    }

    #[test]
    fn test_strongly_connected_components() {
        let graph = graph(&[("a", "b"), ("b", "a"), ("b", "c"), ("c", "d"), ("d", "c")]);
        assert_eq!(
            graph.strongly_connected_components(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string(), "d".to_string()]]
        );
    }
}
