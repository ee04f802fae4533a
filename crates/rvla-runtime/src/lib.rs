//! # RVLA Runtime
//!
//! Step Engine, Context and Visual Examiners, Recursion Engine and the Run
//! Loop of the RVLA browsing agent.

pub mod context_examiner;
pub mod decomposer;
pub mod event_log;
pub mod recursion;
pub mod run_loop;
pub mod scorer;
pub mod step;
pub mod telemetry;
pub mod visual_examiner;
pub mod workspace;

#[cfg(test)]
mod test_support;

pub use context_examiner::{chunk_windows, ChunkedExamination, ContextExaminer, Examination};
pub use decomposer::{
    DecomposeAndExecute, Decomposer, DecompositionNode, ExecutionReport, LeafExecutor, LeafResult,
};
pub use event_log::{cosine_similarity, EventLog};
pub use recursion::RecursionEngine;
pub use run_loop::{Agent, RunReport, SubcallExecutor, SubcallReport, Termination};
pub use scorer::{efficiency, score, task_success, Efficiency, RunOutcome, Score, TaskSuccess, TaskTarget};
pub use step::{adaptive_context_window, translate, StepEngine, StepSettings};
pub use telemetry::{CallStatus, StepTrace, TelemetryError, TelemetryHandle, TracedCall};
pub use visual_examiner::{GridSize, VisualExaminer, VisualFinding, VisualReport};
pub use workspace::{InMemoryHistoryStore, Workspace, EVENTS_KEY};
