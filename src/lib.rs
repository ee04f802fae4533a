//! # RVLA
//!
//! Recursive web-navigation agent. This crate re-exports the public API of
//! the workspace and wires configured backends together.
//!
//! ```no_run
//! # async fn demo(browser: std::sync::Arc<dyn rvla::BrowserDriver>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = rvla::ConfigLoader::load_or_default(None)?;
//! let workspace = rvla::open_workspace(&config.workspace).await?;
//! let agent = rvla::openai_agent(&config, browser)?;
//! let report = agent.run("find the pricing page", &workspace).await?;
//! println!("success: {}", report.score.success);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

pub use rvla_config::{Config, ConfigLoader, ConfigValidator, WorkspaceConfig};
pub use rvla_oracle_openai::OpenAIOracle;
pub use rvla_protocols::*;
pub use rvla_runtime::{
    Agent, ContextExaminer, Decomposer, DecompositionNode, EventLog, InMemoryHistoryStore,
    LeafExecutor, RecursionEngine, RunOutcome, RunReport, StepEngine, SubcallExecutor,
    SubcallReport, TaskTarget, TelemetryHandle, Termination, VisualExaminer, Workspace,
    efficiency, score, task_success,
};
pub use rvla_runtime::telemetry;
pub use rvla_store_sqlite::SqliteHistoryStore;

/// Open the history store selected by `config.backend`.
pub async fn open_workspace(config: &WorkspaceConfig) -> Result<Workspace, StoreError> {
    match config.backend.as_str() {
        "memory" => Ok(Workspace::in_memory(config.namespace.clone())),
        "sqlite" => {
            let path = config.resolved_path();
            info!("Using sqlite workspace at {}", path.display());
            let store = SqliteHistoryStore::open(path, config.namespace.clone()).await?;
            Ok(Workspace::new(Arc::new(store)))
        }
        other => Err(StoreError::Connection(format!(
            "unknown workspace backend '{}'",
            other
        ))),
    }
}

/// Validate `config` and build an agent over the given collaborators.
pub fn build_agent(
    config: &Config,
    oracle: Arc<dyn DecisionOracle>,
    examiner: Arc<dyn SnippetExaminer>,
    browser: Arc<dyn BrowserDriver>,
) -> Result<Agent, AgentError> {
    let validation = ConfigValidator::ensure_valid(config)
        .map_err(|e| AgentError::InvalidConfig(e.to_string()))?;
    for warning in &validation.warnings {
        warn!("{}: {}", warning.path, warning.message);
    }
    Ok(Agent::new(oracle, examiner, browser, config))
}

/// Agent whose oracle, examiner and summarizer all use the configured
/// OpenAI-compatible endpoint.
pub fn openai_agent(config: &Config, browser: Arc<dyn BrowserDriver>) -> Result<Agent, AgentError> {
    let oracle = Arc::new(OpenAIOracle::new(&config.oracle));
    let agent = build_agent(config, oracle.clone(), oracle.clone(), browser)?;
    Ok(agent.with_summarizer(oracle))
}
