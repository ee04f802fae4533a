//! Per-branch agent state.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// Default recursion ceiling.
pub const DEFAULT_MAX_DEPTH: u32 = 5;

/// Mutable record owned by exactly one branch.
///
/// Child branches receive a fresh state through [`AgentState::child`]; no
/// field is ever shared with the parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub goal: String,
    pub depth: u32,
    pub max_depth: u32,
    pub step_count: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_goal: Option<String>,
}

impl AgentState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self::with_max_depth(goal, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(goal: impl Into<String>, max_depth: u32) -> Self {
        Self {
            goal: goal.into(),
            depth: 0,
            max_depth,
            step_count: 0,
            parent_goal: None,
        }
    }

    /// Whether a child branch may still be created below this one.
    pub fn can_subcall(&self) -> bool {
        self.depth < self.max_depth
    }

    /// Build the state of a child branch one level deeper.
    ///
    /// Fails with [`AgentError::DepthLimitReached`] instead of creating a
    /// state whose depth would exceed `max_depth`.
    pub fn child(&self, task: impl Into<String>) -> Result<AgentState, AgentError> {
        if !self.can_subcall() {
            return Err(AgentError::DepthLimitReached {
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }

        Ok(AgentState {
            goal: task.into(),
            depth: self.depth + 1,
            max_depth: self.max_depth,
            step_count: 0,
            parent_goal: Some(self.goal.clone()),
        })
    }
}
