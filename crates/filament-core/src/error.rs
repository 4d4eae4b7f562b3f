use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in filament-core.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed line in a text input file.
    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    /// Edge weight outside the accepted domain.
    #[error("invalid edge weight {weight}: weights must be finite and non-negative")]
    InvalidWeight { weight: f32 },
    /// Paired matrices disagree in shape.
    #[error("shape mismatch: group half is {group:?}, feature half is {feature:?}")]
    ShapeMismatch {
        group: (usize, usize),
        feature: (usize, usize),
    },
    /// Row count does not match the id list.
    #[error("embedding table has {rows} rows but {ids} ids")]
    RowCountMismatch { rows: usize, ids: usize },
}

/// Result type alias for filament-core.
pub type Result<T> = std::result::Result<T, Error>;
