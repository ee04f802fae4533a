//! Append-only event log entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Metadata;

/// Kind of an [`Event`]. Rendered as the prefix of the event's log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Step,
    Plan,
    Observe,
    ObserveAfter,
    Act,
    Subcall,
    SubcallResult,
    SubcallRefused,
    RlmExamination,
    VisualRlm,
    Analysis,
    Done,
    Delegated,
    CompressedContext,
    Summary,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Step => "step",
            Self::Plan => "plan",
            Self::Observe => "observe",
            Self::ObserveAfter => "observe_after",
            Self::Act => "act",
            Self::Subcall => "subcall",
            Self::SubcallResult => "subcall_result",
            Self::SubcallRefused => "subcall_refused",
            Self::RlmExamination => "rlm_examination",
            Self::VisualRlm => "visual_rlm",
            Self::Analysis => "analysis",
            Self::Done => "done",
            Self::Delegated => "delegated",
            Self::CompressedContext => "compressed_context",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default importance for events that were not scored.
pub const DEFAULT_IMPORTANCE: f32 = 0.5;

/// An immutable entry of the agent's memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "type")]
    pub kind: EventKind,

    pub content: String,

    /// Importance score (0.0 - 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Event {
    pub fn new(kind: EventKind, content: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            content: content.into(),
            importance: None,
            embedding: None,
            metadata: Metadata::new(),
        }
    }

    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = Some(importance.clamp(0.0, 1.0));
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Marker placed at the head of a child branch's compressed history.
    pub fn compressed_context(parent_goal: &str) -> Self {
        Self::new(
            EventKind::CompressedContext,
            format!("Parent goal: {}", parent_goal),
        )
    }

    pub fn importance_or_default(&self) -> f32 {
        self.importance.unwrap_or(DEFAULT_IMPORTANCE)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EventKind::CompressedContext => write!(f, "[{}] {}", self.kind, self.content),
            _ => write!(f, "{}:{}", self.kind, self.content),
        }
    }
}
