//! Context and visual examiner errors.

use thiserror::Error;

/// Failure while examining text or image context.
///
/// Examiner failures are always recovered locally by falling back to the
/// unexamined input; they never abort a step.
#[derive(Debug, Error)]
pub enum ExaminerError {
    #[error("Examiner backend failed: {0}")]
    Backend(String),

    #[error("Malformed examination: {0}")]
    Malformed(String),

    #[error("Image processing failed: {0}")]
    Image(String),

    #[error("Invalid chunking: overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidChunking { chunk_size: usize, overlap: usize },
}

impl From<super::OracleError> for ExaminerError {
    fn from(err: super::OracleError) -> Self {
        match err {
            super::OracleError::EmptyResponse => Self::Malformed("empty content".to_string()),
            super::OracleError::Malformed(msg) => Self::Malformed(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}
