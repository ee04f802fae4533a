//! Follow-up delegation errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DelegationError {
    #[error("No agent can handle task: {0}")]
    NoCapableAgent(String),

    #[error("Delegation failed: {0}")]
    Failed(String),
}
