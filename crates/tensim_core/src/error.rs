use std::path::PathBuf;
use thiserror::Error;

/// Failure kinds reported by the tensor store, the vector/matrix layer, the
/// steppers and the serializer.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("{op}: dimension mismatch (expected {expected}, got {actual})")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{op}: shape mismatch (expected {expected:?}, got {actual:?})")]
    ShapeMismatch {
        op: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{op}: index {index} out of range (bound {bound})")]
    IndexOutOfRange {
        op: &'static str,
        index: usize,
        bound: usize,
    },

    #[error("failed to allocate a buffer of {elements} elements")]
    AllocationFailure { elements: usize },

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, SimError>;

pub(crate) fn ensure_len(op: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SimError::DimensionMismatch {
            op,
            expected,
            actual,
        });
    }
    Ok(())
}
