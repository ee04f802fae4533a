//! SQLite history store for RVLA.
//!
//! Persists workspace entries so a run can be followed and resumed from
//! another process.

mod backend;
mod schema;

pub use backend::SqliteHistoryStore;
