//! Delegation protocol definitions.
//!
//! When a run finishes with follow-up tasks, each one is handed to a
//! [`Delegator`] that routes it to an agent with the required capabilities.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DelegationError;
use crate::types::FollowupTask;

/// Core trait for task delegation backends.
#[async_trait]
pub trait Delegator: Send + Sync {
    /// Hand off a follow-up task.
    async fn delegate(&self, task: &FollowupTask) -> Result<DelegationReceipt, DelegationError>;
}

/// Outcome of a delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegationReceipt {
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl DelegationReceipt {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            assignee: None,
        }
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }
}
