use thiserror::Error;

/// Errors that can occur in filament-infer.
#[derive(Error, Debug)]
pub enum Error {
    /// Edge weights cannot be normalized (no edges, or max weight <= 0).
    #[error("degenerate edge weights: normalization requires a positive maximum weight")]
    DegenerateWeights,
    /// Seed state rows do not match the graph's node count.
    #[error("graph has {nodes} nodes but seed state has {rows} rows")]
    FeatureCountMismatch { nodes: usize, rows: usize },
}

/// Result type alias for filament-infer.
pub type Result<T> = std::result::Result<T, Error>;
