//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_engine;
mod schema_infra;

pub use schema_engine::*;
pub use schema_infra::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub visual: VisualConfig,

    #[serde(default)]
    pub recursion: RecursionConfig,

    #[serde(default)]
    pub compaction: CompactionConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub oracle: OracleConfig,
}

/// Run Loop limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Iteration ceiling for one top-level run.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Recursion ceiling.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Step ceiling for one child branch.
    #[serde(default = "default_subcall_step_budget")]
    pub subcall_step_budget: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            max_depth: default_max_depth(),
            subcall_step_budget: default_subcall_step_budget(),
        }
    }
}

fn default_max_iterations() -> u32 {
    30
}

fn default_max_depth() -> u32 {
    5
}

fn default_subcall_step_budget() -> u32 {
    5
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
