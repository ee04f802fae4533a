//! History store protocol definitions.
//!
//! A history store is a namespaced key/value workspace holding JSON values.
//! The agent keeps its event log under a single key so a run can resume.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

/// Core trait for workspace storage backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Returns the backend ID.
    fn id(&self) -> &str;

    /// Read a value. Missing keys yield `None`.
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Append to the list stored under `key`, creating it when absent.
    /// Returns the list as stored after the append.
    async fn append(&self, key: &str, value: Value) -> Result<Vec<Value>, StoreError> {
        let mut items = match self.get(key).await? {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(StoreError::NotAList {
                    key: key.to_string(),
                })
            }
        };
        items.push(value);
        self.set(key, Value::Array(items.clone())).await?;
        Ok(items)
    }

    /// Read a value, falling back to `default` when missing.
    async fn get_or(&self, key: &str, default: Value) -> Result<Value, StoreError> {
        Ok(self.get(key).await?.unwrap_or(default))
    }
}
