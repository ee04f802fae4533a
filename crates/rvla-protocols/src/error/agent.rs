//! Run-level agent errors.

use thiserror::Error;

use super::OracleError;

#[derive(Debug, Error)]
pub enum AgentError {
    /// The Decision Oracle produced no usable decision. Aborts the run.
    #[error("Planning failed: {0}")]
    Planning(#[from] OracleError),

    /// A child branch would exceed the recursion ceiling.
    #[error("Recursion depth limit reached: depth {depth} of max {max_depth}")]
    DepthLimitReached { depth: u32, max_depth: u32 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
