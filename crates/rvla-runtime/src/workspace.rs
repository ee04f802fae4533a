//! Run workspace: event log persistence over a history store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use rvla_protocols::error::StoreError;
use rvla_protocols::store::HistoryStore;
use rvla_protocols::types::Event;

/// Key the event log is stored under.
pub const EVENTS_KEY: &str = "events";

/// Process-local history store.
pub struct InMemoryHistoryStore {
    namespace: String,
    entries: RwLock<HashMap<String, Value>>,
}

impl InMemoryHistoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new("rvla")
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.read().get(&self.scoped(key)).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.write().insert(self.scoped(key), value);
        Ok(())
    }

    async fn append(&self, key: &str, value: Value) -> Result<Vec<Value>, StoreError> {
        let mut entries = self.entries.write();
        let slot = entries
            .entry(self.scoped(key))
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => {
                items.push(value);
                Ok(items.clone())
            }
            _ => Err(StoreError::NotAList {
                key: key.to_string(),
            }),
        }
    }
}

/// The history store as seen by one run.
#[derive(Clone)]
pub struct Workspace {
    store: Arc<dyn HistoryStore>,
}

impl Workspace {
    pub fn new(store: Arc<dyn HistoryStore>) -> Self {
        Self { store }
    }

    /// Workspace over a fresh in-memory store.
    pub fn in_memory(namespace: impl Into<String>) -> Self {
        Self::new(Arc::new(InMemoryHistoryStore::new(namespace)))
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Events persisted so far; empty when nothing was saved yet.
    pub async fn load_events(&self) -> Result<Vec<Event>, StoreError> {
        match self.store.get(EVENTS_KEY).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    /// Replace the persisted event log.
    pub async fn save_events(&self, events: &[Event]) -> Result<(), StoreError> {
        let value = serde_json::to_value(events)?;
        self.store.set(EVENTS_KEY, value).await
    }

    pub async fn append_event(&self, event: &Event) -> Result<(), StoreError> {
        let value = serde_json::to_value(event)?;
        self.store.append(EVENTS_KEY, value).await.map(|_| ())
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("store", &self.store.id())
            .finish()
    }
}
