//! Core data structures for the filament link-prediction pipeline.
//!
//! `filament-core` owns the graph model and the on-disk formats shared by
//! the inference and training crates:
//!
//! - [`WeightedGraph`]: a directed graph with string node ids and `f32`
//!   edge weights, loaded from plain-text edgelist files.
//! - [`FeaturePair`]: the paired per-node state matrices (group half and
//!   feature half) consumed by both pipelines. The pairing is an explicit,
//!   validated contract: both halves must agree in shape.
//! - [`EmbeddingTable`]: node embeddings with external ids, read from and
//!   written to the text format used for experiment outputs.
//!
//! # Example
//!
//! ```rust
//! use filament_core::WeightedGraph;
//!
//! let mut g = WeightedGraph::new();
//! g.add_edge("a", "b", 2.0).unwrap();
//! g.add_edge("b", "c", 1.0).unwrap();
//!
//! assert_eq!(g.node_count(), 3);
//! assert_eq!(g.max_weight(), Some(2.0));
//! ```

mod embeddings;
mod error;
mod features;
mod graph;

pub use embeddings::EmbeddingTable;
pub use error::{Error, Result};
pub use features::FeaturePair;
pub use graph::WeightedGraph;
