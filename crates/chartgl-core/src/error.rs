//! Error types for chartgl.

use thiserror::Error;

use crate::graphic::GraphicId;

/// The main error type for chartgl model operations.
#[derive(Error, Debug)]
pub enum ChartError {
    /// An extent with a zero, inverted or non-finite range reached a transform.
    #[error("degenerate extent on {axis} axis: [{min}, {max}]")]
    DegenerateExtent {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    /// A graphic with the given id was not found.
    #[error("graphic {0} not found")]
    GraphicNotFound(GraphicId),

    /// Insert position outside the collection.
    #[error("insert index {index} out of range for collection of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A legend scheme that cannot be laid out or sampled.
    #[error("malformed legend scheme: {0}")]
    MalformedLegend(String),

    /// A normalization function with invalid parameters.
    #[error("invalid normalization: {0}")]
    InvalidNormalize(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for chartgl model operations.
pub type Result<T> = std::result::Result<T, ChartError>;
