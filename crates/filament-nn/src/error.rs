use thiserror::Error;

/// Errors that can occur in filament-nn.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the core data layer.
    #[error(transparent)]
    Core(#[from] filament_core::Error),
    /// Tensor backend error.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),
    /// Training loss left the finite range.
    #[error("non-finite loss {value} at epoch {epoch}")]
    NonFiniteLoss { epoch: usize, value: f32 },
    /// Feature rows do not match the graph's node count.
    #[error("graph has {nodes} nodes but features have {rows} rows")]
    FeatureCountMismatch { nodes: usize, rows: usize },
}

/// Result type alias for filament-nn.
pub type Result<T> = std::result::Result<T, Error>;
