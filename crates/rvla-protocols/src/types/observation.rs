//! Browser observations and screenshot payloads.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::Metadata;

/// A page screenshot, held as base64-encoded PNG.
///
/// Base64 is the form every language-model layer consumes, so the encoded
/// length is also what size thresholds are measured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Screenshot {
    base64: String,
}

impl Screenshot {
    pub fn from_base64(base64: impl Into<String>) -> Self {
        Self {
            base64: base64.into(),
        }
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Self {
        Self {
            base64: STANDARD.encode(bytes),
        }
    }

    pub fn as_base64(&self) -> &str {
        &self.base64
    }

    /// Length of the encoded payload.
    pub fn encoded_len(&self) -> usize {
        self.base64.len()
    }

    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.base64.as_bytes())
    }

    /// `data:` URL suitable for vision-capable chat APIs.
    pub fn data_url(&self) -> String {
        format!("data:image/png;base64,{}", self.base64)
    }
}

/// Result of querying the browser. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<Screenshot>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_snapshot: Option<String>,

    #[serde(default)]
    pub metadata: Metadata,
}

impl Observation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            screenshot: None,
            dom_snapshot: None,
            metadata: Metadata::new(),
        }
    }

    /// Metadata-only observation used when the browser could not be queried.
    pub fn degraded(url: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut observation = Self::new(url);
        observation
            .metadata
            .insert("degraded".to_string(), serde_json::Value::Bool(true));
        observation.metadata.insert(
            "error".to_string(),
            serde_json::Value::String(reason.into()),
        );
        observation
    }

    pub fn with_screenshot(mut self, screenshot: Screenshot) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    pub fn with_dom_snapshot(mut self, dom: impl Into<String>) -> Self {
        self.dom_snapshot = Some(dom.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.metadata
            .get("degraded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// Copy of this observation without the image payload.
    pub fn without_screenshot(&self) -> Self {
        Self {
            url: self.url.clone(),
            screenshot: None,
            dom_snapshot: self.dom_snapshot.clone(),
            metadata: self.metadata.clone(),
        }
    }
}
