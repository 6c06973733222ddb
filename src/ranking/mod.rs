//! Importance ranking over the resolved call graph.
//!
//! Damped power iteration (PageRank family). Every node starts with equal
//! mass; each iteration a node distributes its mass to its callees
//! proportionally to out-degree. The damping residual plus explicit
//! redistribution of dangling-node mass guarantees convergence on graphs
//! with sinks or disconnected components. Iteration stops when the L1
//! delta drops below the tolerance; the iteration cap is a safety net.
//!
//! Scores are non-negative, sum to 1 after the final normalization, and
//! are deterministic for a given graph and configuration.

use crate::ProfileId;
use crate::config::RankingConfig;
use crate::storage::CallGraph;
use std::collections::HashMap;

pub fn rank(graph: &CallGraph, config: &RankingConfig) -> HashMap<ProfileId, f64> {
    let nodes = graph.node_ids();
    let n = nodes.len();
    if n == 0 {
        return HashMap::new();
    }

    let position: HashMap<ProfileId, usize> =
        nodes.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    // Adjacency with multiplicity: parallel call sites weigh double.
    let mut out_degree = vec![0usize; n];
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    for edge in graph.edges() {
        let caller = position[&edge.caller];
        let callee = position[&edge.callee];
        out_degree[caller] += 1;
        predecessors[callee].push(caller);
    }

    let dangling: Vec<usize> = (0..n).filter(|&i| out_degree[i] == 0).collect();

    let damping = config.damping;
    let initial = 1.0 / n as f64;
    let mut ranks = vec![initial; n];

    for _ in 0..config.max_iterations {
        let previous = ranks.clone();
        let dangling_mass: f64 = dangling.iter().map(|&i| previous[i]).sum();
        let dangling_contrib = damping * dangling_mass / n as f64;

        for (i, rank) in ranks.iter_mut().enumerate() {
            let rank_sum: f64 = predecessors[i]
                .iter()
                .map(|&p| previous[p] / out_degree[p] as f64)
                .sum();
            *rank = (1.0 - damping) / n as f64 + damping * rank_sum + dangling_contrib;
        }

        let error: f64 = ranks
            .iter()
            .zip(&previous)
            .map(|(a, b)| (a - b).abs())
            .sum();
        if error < config.tolerance {
            break;
        }
    }

    let total: f64 = ranks.iter().sum();
    if total > 0.0 {
        for rank in &mut ranks {
            *rank /= total;
        }
    }

    nodes.iter().copied().zip(ranks).collect()
}
