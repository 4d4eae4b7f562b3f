//! Pairwise scoring of the converged G/F state.

use crate::solver::LinkState;
use serde::{Deserialize, Serialize};

/// A directed edge produced by link inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredEdge {
    /// Source node position.
    pub source: usize,
    /// Target node position.
    pub target: usize,
    /// Derived edge weight (the pair's symmetric score).
    pub weight: f32,
}

/// Symmetric pair score:
///
/// ```text
/// score(i, j) = max_weight * (F_i . G_j + F_j . G_i) / 2
/// ```
///
/// `score(i, j) == score(j, i)` by construction.
pub fn score_pair(state: &LinkState, max_weight: f32, i: usize, j: usize) -> f32 {
    let cross = state.f.row(i).dot(&state.g.row(j)) + state.f.row(j).dot(&state.g.row(i));
    max_weight * cross / 2.0
}

/// Score all unordered node pairs and emit those above the threshold.
///
/// Every emitted pair appears as two directed edges, (i, j) and (j, i),
/// sharing the same weight. O(N²) in the node count.
pub fn score_links(state: &LinkState, max_weight: f32, threshold: f32) -> Vec<ScoredEdge> {
    let n = state.g.nrows();
    let mut links = Vec::new();

    for i in 0..n {
        for j in (i + 1)..n {
            let weight = score_pair(state, max_weight, i, j);
            if weight > threshold {
                links.push(ScoredEdge {
                    source: i,
                    target: j,
                    weight,
                });
                links.push(ScoredEdge {
                    source: j,
                    target: i,
                    weight,
                });
            }
        }
    }

    links
}
