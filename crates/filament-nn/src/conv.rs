//! Weighted-mean graph convolution.
//!
//! Follows the message-passing paradigm: aggregate neighbor features,
//! transform, combine with the node's own transform:
//!
//! ```text
//! h_i' = W_self * h_i + W_neighbor * MEAN_w({h_j : j in N(i)})
//! ```
//!
//! where the mean is weighted by the edge weights in the adjacency matrix.

use candle_core::{Result, Tensor};
use candle_nn::{linear, Linear, Module, VarBuilder};
use filament_core::WeightedGraph;

/// GraphSAGE convolution layer with weighted mean aggregation.
///
/// Aggregation works on a dense `(N, N)` adjacency matrix whose entry
/// `(i, j)` carries the weight of edge i -> j; the neighbor mean is the
/// weighted sum divided by the row weight total.
pub struct SageConv {
    lin_self: Linear,
    lin_neighbor: Linear,
    normalize: bool,
}

impl SageConv {
    /// Create a new layer.
    ///
    /// # Arguments
    /// - `in_features`: Input feature dimension
    /// - `out_features`: Output feature dimension
    /// - `normalize`: Whether to L2-normalize output rows
    /// - `vb`: Variable builder for parameter initialization
    pub fn new(
        in_features: usize,
        out_features: usize,
        normalize: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let lin_self = linear(in_features, out_features, vb.pp("lin_self"))?;
        let lin_neighbor = linear(in_features, out_features, vb.pp("lin_neighbor"))?;
        Ok(Self {
            lin_self,
            lin_neighbor,
            normalize,
        })
    }

    /// Forward pass.
    ///
    /// # Arguments
    /// - `x`: Node features (N x in_features)
    /// - `adj`: Weighted adjacency matrix (N x N)
    ///
    /// # Returns
    /// - Node embeddings (N x out_features)
    pub fn forward(&self, x: &Tensor, adj: &Tensor) -> Result<Tensor> {
        // Self features
        let h_self = self.lin_self.forward(x)?;

        // Weighted mean over neighbors: (A * X) / rowsum(A)
        let agg = adj.matmul(x)?;
        let deg = adj.sum(1)?;
        let deg = deg.reshape((deg.elem_count(), 1))?;
        // Avoid division by zero for isolated rows
        let deg = (deg + 1e-6)?;
        let h_agg = agg.broadcast_div(&deg)?;
        let h_neighbor = self.lin_neighbor.forward(&h_agg)?;

        let out = (h_self + h_neighbor)?;

        if self.normalize {
            let norm = out.sqr()?.sum(1)?.sqrt()?;
            let norm = norm.reshape((norm.elem_count(), 1))?;
            let norm = (norm + 1e-6)?;
            out.broadcast_div(&norm)
        } else {
            Ok(out)
        }
    }
}

/// Build the dense weighted adjacency matrix for a graph.
///
/// Entry `(i, j)` is the weight of edge i -> j; parallel edges sum.
pub fn dense_adjacency(graph: &WeightedGraph, device: &candle_core::Device) -> Result<Tensor> {
    let n = graph.node_count();
    let mut data = vec![0.0f32; n * n];
    for (src, dst, w) in graph.edge_triples() {
        data[src * n + dst] += w;
    }
    Tensor::from_vec(data, (n, n), device)
}
