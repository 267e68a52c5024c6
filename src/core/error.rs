//! Error types for SVM inference and model management

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SvmError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Dimension mismatch: expected {expected} components, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("Shape mismatch: file holds {expected} entries per sample, buffer has {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("Class index {index} out of range for model with {n_classes} classes")]
    Index { index: usize, n_classes: usize },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, SvmError>;
