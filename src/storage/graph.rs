//! Resolved call graph.
//!
//! Built once by the resolver after the whole-workspace barrier and
//! read-only afterwards, so no interior locking is needed.

use crate::{CallEdge, Confidence, ProfileId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

pub struct CallGraph {
    graph: DiGraph<ProfileId, Confidence>,
    node_map: HashMap<ProfileId, NodeIndex>,
    /// Insertion order of nodes, which ranking iterates deterministically.
    order: Vec<ProfileId>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Build a graph over `nodes` (in the given order) with `edges`.
    /// Edges referencing unknown nodes are ignored; the resolver never
    /// produces them.
    pub fn build(nodes: impl IntoIterator<Item = ProfileId>, edges: &[CallEdge]) -> Self {
        let mut graph = Self::new();
        for id in nodes {
            graph.add_node(id);
        }
        for edge in edges {
            graph.add_edge(*edge);
        }
        graph
    }

    pub fn add_node(&mut self, id: ProfileId) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(&id) {
            idx
        } else {
            let idx = self.graph.add_node(id);
            self.node_map.insert(id, idx);
            self.order.push(id);
            idx
        }
    }

    pub fn add_edge(&mut self, edge: CallEdge) {
        let (Some(&from), Some(&to)) = (
            self.node_map.get(&edge.caller),
            self.node_map.get(&edge.callee),
        ) else {
            return;
        };
        self.graph.add_edge(from, to, edge.confidence);
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> &[ProfileId] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn out_degree(&self, id: ProfileId) -> usize {
        match self.node_map.get(&id) {
            Some(&idx) => self.graph.edges(idx).count(),
            None => 0,
        }
    }

    /// Direct callees of a profile, in edge insertion order.
    pub fn callees(&self, id: ProfileId) -> Vec<ProfileId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// Direct callers of a profile.
    pub fn callers(&self, id: ProfileId) -> Vec<ProfileId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: ProfileId, direction: Direction) -> Vec<ProfileId> {
        let Some(&idx) = self.node_map.get(&id) else {
            return Vec::new();
        };
        let mut out: Vec<ProfileId> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        // petgraph yields neighbors in reverse insertion order
        out.reverse();
        out
    }

    /// All edges of the graph.
    pub fn edges(&self) -> Vec<CallEdge> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (from, to) = self.graph.edge_endpoints(e)?;
                Some(CallEdge {
                    caller: *self.graph.node_weight(from)?,
                    callee: *self.graph.node_weight(to)?,
                    confidence: *self.graph.edge_weight(e)?,
                })
            })
            .collect()
    }
}

impl Default for CallGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(v: u32) -> ProfileId {
        ProfileId::new(v).unwrap()
    }

    fn edge(caller: u32, callee: u32) -> CallEdge {
        CallEdge {
            caller: id(caller),
            callee: id(callee),
            confidence: Confidence::Exact,
        }
    }

    #[test]
    fn test_build_and_query() {
        let graph = CallGraph::build([id(1), id(2), id(3)], &[edge(1, 2), edge(1, 3), edge(2, 3)]);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.callees(id(1)), vec![id(2), id(3)]);
        assert_eq!(graph.callers(id(3)), vec![id(1), id(2)]);
        assert_eq!(graph.out_degree(id(1)), 2);
        assert_eq!(graph.out_degree(id(3)), 0);
    }

    #[test]
    fn test_duplicate_nodes_are_merged() {
        let mut graph = CallGraph::new();
        let a = graph.add_node(id(1));
        let b = graph.add_node(id(1));
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn test_edges_to_unknown_nodes_are_ignored() {
        let graph = CallGraph::build([id(1)], &[edge(1, 9)]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_node_order_is_insertion_order() {
        let graph = CallGraph::build([id(3), id(1), id(2)], &[]);
        assert_eq!(graph.node_ids(), &[id(3), id(1), id(2)]);
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        // Two call sites from the same caller stay two edges.
        let graph = CallGraph::build([id(1), id(2)], &[edge(1, 2), edge(1, 2)]);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.out_degree(id(1)), 2);
    }
}
