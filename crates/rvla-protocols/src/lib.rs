//! # RVLA Protocols
//!
//! Data model and collaborator traits for the RVLA web agent.
//! Contains only interface definitions - no implementations.
//!
//! ## Core Traits
//!
//! - [`DecisionOracle`] - Plans the next action for a branch
//! - [`SnippetExaminer`] - Judges text and image snippets
//! - [`BrowserDriver`] - Observes pages and executes commands
//! - [`HistoryStore`] - Persists the event log between runs
//! - [`Delegator`] - Hands follow-up tasks to other agents
//! - [`Summarizer`], [`Embedder`], [`TaskDecomposer`] - Auxiliary model calls

pub mod browser;
pub mod delegation;
pub mod error;
pub mod examiner;
pub mod model;
pub mod oracle;
pub mod store;
pub mod types;

pub use browser::BrowserDriver;
pub use delegation::{DelegationReceipt, Delegator};
pub use error::{
    AgentError, BrowserError, DelegationError, ExaminerError, OracleError, StoreError,
};
pub use examiner::{ObservationAnalysis, SnippetExaminer, TextExamination, VisualExamination};
pub use model::{Decomposition, Embedder, Summarizer, TaskDecomposer};
pub use oracle::{DecisionOracle, PlanDecision, PlanRequest};
pub use store::HistoryStore;
pub use types::*;
