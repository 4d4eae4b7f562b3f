//! Fixed-point solver for the latent G/F node state.

use crate::{Error, Result};
use filament_core::{FeaturePair, WeightedGraph};
use ndarray::{Array1, Array2};

/// Solver configuration.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Maximum sweeps before stopping.
    pub max_iterations: usize,
    /// Convergence tolerance (L1 norm of state changes, per estimate).
    pub tolerance: f32,
    /// Minimum pair score for a link to be emitted.
    pub threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tolerance: 1e-3,
            threshold: 30.0,
        }
    }
}

impl SolverConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Converged (or capped) solver state.
#[derive(Debug, Clone)]
pub struct LinkState {
    /// Group estimate, shape `(num_nodes, dim)`.
    pub g: Array2<f32>,
    /// Feature estimate, shape `(num_nodes, dim)`.
    pub f: Array2<f32>,
    /// Sweeps performed.
    pub iterations: usize,
    /// Whether both estimates met the tolerance before the cap.
    pub converged: bool,
}

/// Per-edge weights normalized by the global maximum.
///
/// Returned in `edge_triples` order. The maximum weight after
/// normalization is exactly 1.0. Fails on an edgeless graph or a
/// non-positive maximum; normalizing by zero would silently produce NaN.
pub fn normalized_weights(graph: &WeightedGraph) -> Result<Vec<f32>> {
    let max = graph.max_weight().ok_or(Error::DegenerateWeights)?;
    if max <= 0.0 {
        return Err(Error::DegenerateWeights);
    }
    Ok(graph.edge_triples().map(|(_, _, w)| w / max).collect())
}

/// Adjacency map with normalized weights: for each node, its out-edges as
/// (neighbor position, normalized weight).
fn normalized_adjacency(graph: &WeightedGraph) -> Result<Vec<Vec<(usize, f32)>>> {
    let max = graph.max_weight().ok_or(Error::DegenerateWeights)?;
    if max <= 0.0 {
        return Err(Error::DegenerateWeights);
    }

    let mut adjacency = vec![Vec::new(); graph.node_count()];
    for (src, dst, w) in graph.edge_triples() {
        adjacency[src].push((dst, w / max));
    }
    Ok(adjacency)
}

/// Iterate the G/F estimates to a fixed point.
///
/// Each sweep computes, for every node i with out-degree d_i > 0:
///
/// ```text
/// G[i] = (1/d_i) * sum_j w_ij * F_prev[j]
/// F[i] = 1 - (1/d_i) * sum_j |w_ij - G_prev[j]|
/// ```
///
/// elementwise over the state dimension, where w_ij are the normalized
/// out-edge weights. Nodes with no out-edges keep their seed rows.
/// Updates are synchronous: both estimates are read from the previous
/// sweep's buffers and written to fresh ones.
///
/// Stops when the L1 change in G and the L1 change in F are both within
/// the tolerance, or after `max_iterations` sweeps. Hitting the cap is an
/// accepted approximation, reported via [`LinkState::converged`].
pub fn solve(graph: &WeightedGraph, seed: &FeaturePair, config: &SolverConfig) -> Result<LinkState> {
    let n = graph.node_count();
    if seed.num_nodes() != n {
        return Err(Error::FeatureCountMismatch {
            nodes: n,
            rows: seed.num_nodes(),
        });
    }

    if n == 0 {
        return Ok(LinkState {
            g: seed.group().clone(),
            f: seed.feature().clone(),
            iterations: 0,
            converged: true,
        });
    }

    let adjacency = normalized_adjacency(graph)?;
    let dim = seed.dim();

    let mut g = seed.group().clone();
    let mut f = seed.feature().clone();
    let mut g_next = g.clone();
    let mut f_next = f.clone();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        for (i, neighbors) in adjacency.iter().enumerate() {
            if neighbors.is_empty() {
                // Isolated node: no update applied.
                g_next.row_mut(i).assign(&g.row(i));
                f_next.row_mut(i).assign(&f.row(i));
                continue;
            }

            let inv_degree = 1.0 / neighbors.len() as f32;
            let mut g_acc = Array1::<f32>::zeros(dim);
            let mut f_acc = Array1::<f32>::zeros(dim);
            for &(j, w) in neighbors {
                g_acc.scaled_add(w, &f.row(j));
                f_acc += &g.row(j).mapv(|x| (w - x).abs());
            }

            g_acc *= inv_degree;
            f_acc.mapv_inplace(|x| 1.0 - x * inv_degree);
            g_next.row_mut(i).assign(&g_acc);
            f_next.row_mut(i).assign(&f_acc);
        }

        let g_delta = l1_delta(&g, &g_next);
        let f_delta = l1_delta(&f, &f_next);

        std::mem::swap(&mut g, &mut g_next);
        std::mem::swap(&mut f, &mut f_next);
        iterations += 1;

        if g_delta <= config.tolerance && f_delta <= config.tolerance {
            converged = true;
            break;
        }
    }

    Ok(LinkState {
        g,
        f,
        iterations,
        converged,
    })
}

fn l1_delta(prev: &Array2<f32>, next: &Array2<f32>) -> f32 {
    prev.iter()
        .zip(next.iter())
        .map(|(a, b)| (a - b).abs())
        .sum()
}
