//! Custom error types for pixelseg.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the pixelseg library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Input array does not have the shape an operation requires.
    #[error("invalid shape: expected {expected}, got {actual}")]
    InvalidShape { expected: String, actual: String },

    /// A cluster label has no pixels at the point its mean is computed.
    #[error("cluster {cluster} has no assigned pixels")]
    EmptyCluster { cluster: usize },

    /// An iterative loop hit its iteration cap before converging.
    #[error("{stage} did not converge within {iterations} iterations")]
    NonConvergence {
        stage: &'static str,
        iterations: usize,
    },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pixelseg operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}
