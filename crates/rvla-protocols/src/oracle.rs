//! Decision Oracle protocol.
//!
//! The Decision Oracle turns goal + history + observation into the next
//! decision. The core never talks to a language model directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::types::{FollowupTask, Observation, Screenshot};

/// Core trait for planning backends.
#[async_trait]
pub trait DecisionOracle: Send + Sync {
    /// Returns the oracle ID.
    fn id(&self) -> &str;

    /// Plan the next action for a branch.
    async fn plan_next_action(&self, request: PlanRequest) -> Result<PlanDecision, OracleError>;
}

/// Everything the oracle sees for one decision.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub goal: String,

    /// Latest observation with its image payload removed.
    pub observation: Option<Observation>,

    /// Effective history, oldest first, one rendered event per line.
    pub history: Vec<String>,

    /// `history[0]` is an examined summary of the events before the rest.
    pub summarized: bool,

    pub depth: u32,

    /// Screenshot forwarded as-is; `None` when it was examined in regions.
    pub screenshot: Option<Screenshot>,
}

/// Structured oracle response before translation into an `Action`.
///
/// `action_type` values other than `subcall` and `done` are treated as `act`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanDecision {
    #[serde(default)]
    pub action_type: String,

    #[serde(default)]
    pub reasoning: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub followup_tasks: Vec<FollowupTask>,
}

impl PlanDecision {
    pub fn act(command: impl Into<String>) -> Self {
        Self {
            action_type: "act".to_string(),
            command: Some(command.into()),
            ..Default::default()
        }
    }

    pub fn subcall(task: impl Into<String>) -> Self {
        Self {
            action_type: "subcall".to_string(),
            task: Some(task.into()),
            ..Default::default()
        }
    }

    pub fn done(reasoning: impl Into<String>) -> Self {
        Self {
            action_type: "done".to_string(),
            reasoning: reasoning.into(),
            ..Default::default()
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}
