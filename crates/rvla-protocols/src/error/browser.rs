//! Browser collaborator errors.

use thiserror::Error;

/// Perception or actuation failure. Recovered by the Run Loop with a
/// metadata-only observation.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Observation failed: {0}")]
    ObserveFailed(String),

    #[error("Action '{command}' failed: {message}")]
    ActionFailed { command: String, message: String },
}
