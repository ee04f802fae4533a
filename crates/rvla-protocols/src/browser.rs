//! Browser driver protocol definitions.
//!
//! The agent never drives a browser engine itself. A [`BrowserDriver`]
//! produces observations and executes browser-level commands.

use async_trait::async_trait;

use crate::error::BrowserError;
use crate::types::{ActRequest, Observation};

/// Core trait for browser backends.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Returns the driver ID.
    fn id(&self) -> &str;

    /// Capture the current page.
    async fn observe(&self) -> Result<Observation, BrowserError>;

    /// Execute a browser command.
    async fn act(&self, request: &ActRequest) -> Result<(), BrowserError>;

    /// Release the underlying browser. Defaults to a no-op.
    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}
