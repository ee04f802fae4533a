//! Examination and history-management settings.

use serde::{Deserialize, Serialize};

/// History examination by the Step Engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Event count above which history is examined instead of sent whole.
    #[serde(default = "default_examination_threshold")]
    pub examination_threshold: usize,

    /// Recent events kept next to the examined summary.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,

    /// Window size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive windows.
    #[serde(default = "default_overlap")]
    pub overlap: usize,

    #[serde(default = "default_text_top_k")]
    pub top_k: usize,

    /// Truncation applied to summaries written to the event log.
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            examination_threshold: default_examination_threshold(),
            recent_window: default_recent_window(),
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            top_k: default_text_top_k(),
            summary_chars: default_summary_chars(),
        }
    }
}

fn default_examination_threshold() -> usize {
    20
}

fn default_recent_window() -> usize {
    10
}

fn default_chunk_size() -> usize {
    1000
}

fn default_overlap() -> usize {
    200
}

fn default_text_top_k() -> usize {
    5
}

fn default_summary_chars() -> usize {
    100
}

/// Region-based screenshot examination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualConfig {
    /// Base64 length above which a screenshot is examined in regions.
    #[serde(default = "default_screenshot_threshold")]
    pub screenshot_threshold: usize,

    #[serde(default = "default_grid")]
    pub grid_rows: u32,

    #[serde(default = "default_grid")]
    pub grid_cols: u32,

    #[serde(default = "default_visual_top_k")]
    pub top_k: usize,
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            screenshot_threshold: default_screenshot_threshold(),
            grid_rows: default_grid(),
            grid_cols: default_grid(),
            top_k: default_visual_top_k(),
        }
    }
}

fn default_screenshot_threshold() -> usize {
    50_000
}

fn default_grid() -> u32 {
    3
}

fn default_visual_top_k() -> usize {
    3
}

/// Child-context compression applied at a subcall boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecursionConfig {
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: usize,

    #[serde(default = "default_recursion_keep_recent")]
    pub keep_recent: usize,
}

impl Default for RecursionConfig {
    fn default() -> Self {
        Self {
            compression_threshold: default_compression_threshold(),
            keep_recent: default_recursion_keep_recent(),
        }
    }
}

fn default_compression_threshold() -> usize {
    20
}

fn default_recursion_keep_recent() -> usize {
    5
}

/// Summarizing compaction of a long-running event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactionConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_compaction_threshold")]
    pub threshold: usize,

    #[serde(default = "default_compaction_keep_recent")]
    pub keep_recent: usize,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: default_compaction_threshold(),
            keep_recent: default_compaction_keep_recent(),
        }
    }
}

fn default_compaction_threshold() -> usize {
    50
}

fn default_compaction_keep_recent() -> usize {
    20
}
