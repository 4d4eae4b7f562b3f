//! Implicit-link inference over weighted graphs.
//!
//! Estimates two latent vectors per node by fixed-point iteration over the
//! edge list, then scores every node pair to surface links the explicit
//! edge list does not contain:
//!
//! - **G** (group): a smoothed neighbor-weighted aggregate signal.
//! - **F** (feature): a complementary deviation signal derived from
//!   neighbor disagreement.
//!
//! Each sweep recomputes both vectors for every node from the previous
//! sweep's values (synchronous update over a double buffer), stopping when
//! the L1 change in both estimates falls under the tolerance or the
//! iteration cap is reached. Converged state is scored pairwise; pairs
//! above the threshold are emitted as directed edges in both directions.
//!
//! Pair scoring is quadratic in the node count, which is acceptable for
//! the small experiment graphs this crate targets.
//!
//! # Example
//!
//! ```rust,ignore
//! use filament_core::{FeaturePair, WeightedGraph};
//! use filament_infer::{infer_links, SolverConfig};
//!
//! let graph = WeightedGraph::from_edgelist_file("graph.edges")?;
//! let seed = FeaturePair::from_files("group.txt", "features.txt")?;
//!
//! let links = infer_links(&graph, &seed, &SolverConfig::default())?;
//! for edge in &links {
//!     println!("{} -> {} ({})", edge.source, edge.target, edge.weight);
//! }
//! ```

mod error;
mod scoring;
mod solver;

pub use error::{Error, Result};
pub use scoring::{score_links, score_pair, ScoredEdge};
pub use solver::{normalized_weights, solve, LinkState, SolverConfig};

use filament_core::{FeaturePair, WeightedGraph};

/// Run the full inference pipeline: solve to a fixed point, then score
/// all node pairs and emit links above the threshold.
///
/// O(N²) in the node count during scoring.
pub fn infer_links(
    graph: &WeightedGraph,
    seed: &FeaturePair,
    config: &SolverConfig,
) -> Result<Vec<ScoredEdge>> {
    let state = solve(graph, seed, config)?;
    let max_weight = graph.max_weight().unwrap_or(0.0);
    Ok(score_links(&state, max_weight, config.threshold))
}
