//! Typed agent decisions.
//!
//! Every Step Engine invocation produces exactly one [`Action`]. The Run Loop
//! matches on it exhaustively; there is no stringly-typed payload lookup.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Metadata;

/// Browser command requested by an `act` decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BrowserCommand {
    Observe,
    Navigate,
    Click,
    Type,
    Scroll,
    /// A command the core does not interpret; forwarded to the browser as-is.
    Other(String),
}

impl BrowserCommand {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Observe => "observe",
            Self::Navigate => "navigate",
            Self::Click => "click",
            Self::Type => "type",
            Self::Scroll => "scroll",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_observe(&self) -> bool {
        matches!(self, Self::Observe)
    }
}

impl Default for BrowserCommand {
    fn default() -> Self {
        Self::Observe
    }
}

impl From<&str> for BrowserCommand {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "observe" => Self::Observe,
            "navigate" => Self::Navigate,
            "click" => Self::Click,
            "type" => Self::Type,
            "scroll" => Self::Scroll,
            _ => Self::Other(raw.trim().to_string()),
        }
    }
}

impl From<String> for BrowserCommand {
    fn from(raw: String) -> Self {
        Self::from(raw.as_str())
    }
}

impl From<BrowserCommand> for String {
    fn from(command: BrowserCommand) -> Self {
        command.as_str().to_string()
    }
}

impl fmt::Display for BrowserCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an `act` decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActRequest {
    #[serde(default)]
    pub command: BrowserCommand,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default)]
    pub reasoning: String,
}

impl ActRequest {
    pub fn new(command: BrowserCommand) -> Self {
        Self {
            command,
            target: None,
            text: None,
            reasoning: String::new(),
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

/// A follow-up task handed to an external delegation collaborator on completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupTask {
    pub task: String,

    #[serde(default)]
    pub capabilities: Vec<String>,

    #[serde(default)]
    pub context: Metadata,
}

impl FollowupTask {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            capabilities: Vec::new(),
            context: Metadata::new(),
        }
    }
}

/// Discriminant of an [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Act,
    Subcall,
    Done,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Subcall => "subcall",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable typed decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Perform a browser command.
    Act(ActRequest),

    /// Delegate a sub-task to a child branch.
    Subcall { task: String, reasoning: String },

    /// Declare the branch finished.
    Done {
        reason: String,
        reasoning: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        followups: Vec<FollowupTask>,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Act(_) => ActionKind::Act,
            Self::Subcall { .. } => ActionKind::Subcall,
            Self::Done { .. } => ActionKind::Done,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn reasoning(&self) -> &str {
        match self {
            Self::Act(request) => &request.reasoning,
            Self::Subcall { reasoning, .. } | Self::Done { reasoning, .. } => reasoning,
        }
    }

    pub fn done(reason: impl Into<String>) -> Self {
        Self::Done {
            reason: reason.into(),
            reasoning: String::new(),
            followups: Vec::new(),
        }
    }

    pub fn subcall(task: impl Into<String>) -> Self {
        Self::Subcall {
            task: task.into(),
            reasoning: String::new(),
        }
    }
}
