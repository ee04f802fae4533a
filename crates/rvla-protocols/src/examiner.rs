//! Examiner oracle protocol.
//!
//! Shared by the Context and Visual Examiners: judges a single text or image
//! snippet against a query without ever seeing the full context.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ExaminerError;
use crate::types::{ContextSnippet, Screenshot, VisualSnippet};

/// Core trait for snippet examination backends.
#[async_trait]
pub trait SnippetExaminer: Send + Sync {
    /// Returns the examiner ID.
    fn id(&self) -> &str;

    /// Judge a text snippet.
    async fn examine_text(
        &self,
        snippet: &ContextSnippet,
        query: &str,
        goal: &str,
    ) -> Result<TextExamination, ExaminerError>;

    /// Judge an image region.
    async fn examine_image(
        &self,
        snippet: &VisualSnippet,
        query: &str,
        goal: &str,
    ) -> Result<VisualExamination, ExaminerError>;

    /// Describe a whole (small) screenshot.
    async fn analyze_observation(
        &self,
        goal: &str,
        screenshot: &Screenshot,
        url: &str,
    ) -> Result<ObservationAnalysis, ExaminerError>;
}

fn default_confidence() -> f32 {
    0.5
}

/// Verdict on a text snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextExamination {
    #[serde(default)]
    pub relevant: bool,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub key_findings: Vec<String>,

    #[serde(default)]
    pub suggested_actions: Vec<String>,

    /// Relevance confidence (0.0 - 1.0).
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl TextExamination {
    pub fn new(relevant: bool, summary: impl Into<String>, confidence: f32) -> Self {
        Self {
            relevant,
            summary: summary.into(),
            key_findings: Vec::new(),
            suggested_actions: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Verdict on an image region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualExamination {
    #[serde(default)]
    pub relevant: bool,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub elements: Vec<String>,

    #[serde(default)]
    pub suggested_actions: Vec<String>,

    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

impl VisualExamination {
    pub fn new(relevant: bool, description: impl Into<String>, confidence: f32) -> Self {
        Self {
            relevant,
            description: description.into(),
            elements: Vec::new(),
            suggested_actions: Vec::new(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Ranking score: the confidence when judged relevant, otherwise zero.
    pub fn score(&self) -> f32 {
        if self.relevant {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Description of a whole screenshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationAnalysis {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub relevant_elements: Vec<String>,

    #[serde(default)]
    pub suggested_actions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,
}
