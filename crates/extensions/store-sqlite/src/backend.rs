//! SQLite history store implementation.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use tokio_rusqlite::Connection;
use tracing::debug;

use rvla_protocols::error::StoreError;
use rvla_protocols::store::HistoryStore;

use crate::schema::init_schema;

#[cfg(test)]
#[path = "backend_tests.rs"]
mod tests;

const SELECT_VALUE: &str = "SELECT value FROM workspace_entries WHERE namespace = ?1 AND key = ?2";

const UPSERT_VALUE: &str = "INSERT INTO workspace_entries (namespace, key, value, updated_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(namespace, key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

/// SQLite-backed history store scoped to one namespace.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Connection,
    namespace: String,
}

impl SqliteHistoryStore {
    /// Create a new in-memory database.
    pub async fn in_memory(namespace: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn, namespace.into()).await
    }

    /// Open (or create) a file-backed database.
    pub async fn open(path: impl AsRef<Path>, namespace: impl Into<String>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
            }
        }
        debug!("Opening history store at {}", path.display());
        let conn = Connection::open(path)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Self::init(conn, namespace.into()).await
    }

    async fn init(conn: Connection, namespace: String) -> Result<Self, StoreError> {
        conn.call(|conn| Ok(init_schema(conn)?))
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;
        Ok(Self { conn, namespace })
    }

    /// Another view of the same database under a different namespace.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            conn: self.conn.clone(),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Keys stored in this namespace, oldest update first.
    pub async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let namespace = self.namespace.clone();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT key FROM workspace_entries WHERE namespace = ?1 ORDER BY updated_at, key",
                )?;
                let keys = stmt
                    .query_map([&namespace], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    fn id(&self) -> &str {
        "sqlite"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let namespace = self.namespace.clone();
        let key = key.to_string();
        let raw = self
            .conn
            .call(move |conn| {
                let value = conn
                    .query_row(SELECT_VALUE, params![namespace, key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?;
                Ok(value)
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let namespace = self.namespace.clone();
        let key = key.to_string();
        let encoded = serde_json::to_string(&value)?;
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(UPSERT_VALUE, params![namespace, key, encoded, now])?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    async fn append(&self, key: &str, value: Value) -> Result<Vec<Value>, StoreError> {
        let namespace = self.namespace.clone();
        let key = key.to_string();
        let now = Utc::now().to_rfc3339();

        let outcome = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let current = tx
                    .query_row(SELECT_VALUE, params![namespace, key], |row| {
                        row.get::<_, String>(0)
                    })
                    .optional()?;

                let mut items = match current.as_deref().map(serde_json::from_str::<Value>) {
                    None => Vec::new(),
                    Some(Ok(Value::Array(items))) => items,
                    Some(Ok(_)) => return Ok(Err(StoreError::NotAList { key })),
                    Some(Err(e)) => return Ok(Err(StoreError::Serialization(e))),
                };
                items.push(value);

                let encoded = match serde_json::to_string(&items) {
                    Ok(encoded) => encoded,
                    Err(e) => return Ok(Err(StoreError::Serialization(e))),
                };
                tx.execute(UPSERT_VALUE, params![namespace, key, encoded, now])?;
                tx.commit()?;
                Ok(Ok(items))
            })
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        outcome
    }
}
