//! Remote key-value sink contract
//!
//! The engine itself never performs I/O; the driver pushes state through
//! this boundary after a batch of mutations. Implementations map paths of
//! the form `<namespace>/queues/line1` to whatever store backs the
//! deployment. The bundled [`InMemorySink`] keeps everything in a map,
//! which is enough for the simulator, tests, and offline operation.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{QueueError, Result};

/// Remote JSON key-value store boundary
#[async_trait]
pub trait SyncSink: Send + Sync {
    /// Create or replace the record at `path`
    async fn upsert(&self, path: &str, json: &str) -> Result<()>;

    /// Remove the record at `path`; removing a missing record is not an
    /// error
    async fn delete(&self, path: &str) -> Result<()>;

    /// Fetch the record at `path`, if present
    async fn get(&self, path: &str) -> Result<Option<String>>;
}

/// Map-backed sink for the simulator, offline operation, and tests
#[derive(Debug, Default)]
pub struct InMemorySink {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored (path, json) pair, sorted by path
    pub fn dump(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .map(|e| e.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        entries.sort();
        entries
    }
}

#[async_trait]
impl SyncSink for InMemorySink {
    async fn upsert(&self, path: &str, json: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| QueueError::SyncFailed {
            path: path.to_string(),
            message: "sink lock poisoned".to_string(),
        })?;
        entries.insert(path.to_string(), json.to_string());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let mut entries = self.entries.write().map_err(|_| QueueError::SyncFailed {
            path: path.to_string(),
            message: "sink lock poisoned".to_string(),
        })?;
        entries.remove(path);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<String>> {
        let entries = self.entries.read().map_err(|_| QueueError::SyncFailed {
            path: path.to_string(),
            message: "sink lock poisoned".to_string(),
        })?;
        Ok(entries.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_get_delete_round_trip() {
        let sink = InMemorySink::new();
        assert!(sink.is_empty());

        sink.upsert("a/b", "{\"x\":1}").await.unwrap();
        assert_eq!(sink.get("a/b").await.unwrap().as_deref(), Some("{\"x\":1}"));

        sink.upsert("a/b", "{\"x\":2}").await.unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.get("a/b").await.unwrap().as_deref(), Some("{\"x\":2}"));

        sink.delete("a/b").await.unwrap();
        assert_eq!(sink.get("a/b").await.unwrap(), None);

        // Deleting again is fine.
        sink.delete("a/b").await.unwrap();
    }

    #[tokio::test]
    async fn dump_is_sorted_by_path() {
        let sink = InMemorySink::new();
        sink.upsert("z", "1").await.unwrap();
        sink.upsert("a", "2").await.unwrap();

        let dump = sink.dump();
        assert_eq!(dump[0].0, "a");
        assert_eq!(dump[1].0, "z");
    }
}
