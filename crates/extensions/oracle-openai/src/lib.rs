//! OpenAI-compatible oracle for RVLA.
//!
//! One HTTP client serving planning, snippet examination, observation
//! analysis, summarization, task decomposition and embeddings.

mod api;
mod oracle;
mod prompt;

pub use oracle::OpenAIOracle;
