//! Error types for the RVLA protocol layer.

mod agent;
mod browser;
mod delegation;
mod examiner;
mod oracle;
mod store;

pub use agent::*;
pub use browser::*;
pub use delegation::*;
pub use examiner::*;
pub use oracle::*;
pub use store::*;
