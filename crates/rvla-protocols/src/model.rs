//! Auxiliary model protocols used outside the decision path.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;
use crate::types::Event;

/// Condenses a run of events into a short summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, events: &[Event]) -> Result<String, OracleError>;
}

/// Produces a vector embedding for a piece of text.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError>;
}

/// Decides whether a task should be split into subtasks.
#[async_trait]
pub trait TaskDecomposer: Send + Sync {
    async fn decompose_task(
        &self,
        task: &str,
        context_summary: &str,
        depth: u32,
        max_depth: u32,
    ) -> Result<Decomposition, OracleError>;
}

/// Decomposition verdict for a single task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Decomposition {
    #[serde(default)]
    pub should_decompose: bool,

    #[serde(default)]
    pub reasoning: String,

    #[serde(default)]
    pub subtasks: Vec<String>,

    /// Suggested first move when the task is executed as a leaf.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
}

impl Decomposition {
    pub fn leaf(reasoning: impl Into<String>) -> Self {
        Self {
            should_decompose: false,
            reasoning: reasoning.into(),
            ..Default::default()
        }
    }

    pub fn split(subtasks: Vec<String>) -> Self {
        Self {
            should_decompose: true,
            subtasks,
            ..Default::default()
        }
    }

    /// Whether this verdict actually yields child tasks.
    pub fn has_subtasks(&self) -> bool {
        self.should_decompose && !self.subtasks.is_empty()
    }
}
