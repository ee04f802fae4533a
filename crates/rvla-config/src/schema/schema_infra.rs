//! Infrastructure configuration types (workspace storage, logging, oracle).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// History store selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Store backend ("memory" or "sqlite").
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Key namespace isolating one agent's entries.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Database file for the sqlite backend.
    #[serde(default = "default_workspace_path")]
    pub path: PathBuf,
}

impl WorkspaceConfig {
    /// `path` with a leading `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        let raw = self.path.to_string_lossy();
        PathBuf::from(shellexpand::tilde(raw.as_ref()).into_owned())
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            namespace: default_namespace(),
            path: default_workspace_path(),
        }
    }
}

fn default_backend() -> String {
    "memory".to_string()
}

fn default_namespace() -> String {
    "rvla".to_string()
}

fn default_workspace_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rvla")
        .join("workspace.db")
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,

    /// Directory for daily-rolling log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
            directory: None,
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_file_prefix() -> String {
    "rvla".to_string()
}

/// OpenAI-compatible oracle adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_planning_model")]
    pub planning_model: String,

    #[serde(default = "default_examiner_model")]
    pub examiner_model: String,

    #[serde(default = "default_vision_model")]
    pub vision_model: String,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            planning_model: default_planning_model(),
            examiner_model: default_examiner_model(),
            vision_model: default_vision_model(),
            embedding_model: default_embedding_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_planning_model() -> String {
    "gpt-4o".to_string()
}

fn default_examiner_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_vision_model() -> String {
    "gpt-4o".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_temperature() -> f32 {
    0.2
}
