//! In-memory backend
//!
//! This is primarily for development and testing.
//! For production, use [`MongoBackend`](super::MongoBackend).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{BackendError, SessionBackend};
use crate::session::SessionRecord;

/// In-memory session backend
///
/// Warning: sessions are lost on restart and not shared across processes.
/// There is no TTL sweeper either; expired records linger until the store's
/// lazy cleanup removes them on read.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
    connected: Arc<AtomicBool>,
}

impl MemoryBackend {
    /// Create a new memory backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct lookup, bypassing the store. Useful in tests to observe what
    /// was actually persisted.
    pub fn record(&self, id: &str) -> Option<SessionRecord> {
        self.records.read().get(id).cloned()
    }

    /// Whether a record exists for `id`
    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are stored
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn connect(&self) -> Result<(), BackendError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn ensure_expires_index(&self) -> Result<(), BackendError> {
        // No background expiry here; nothing to create.
        Ok(())
    }

    async fn find_one(&self, id: &str) -> Result<Option<SessionRecord>, BackendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BackendError::new("not connected"));
        }
        Ok(self.records.read().get(id).cloned())
    }

    async fn upsert(&self, record: SessionRecord) -> Result<(), BackendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BackendError::new("not connected"));
        }
        self.records.write().insert(record.id.clone(), record);
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), BackendError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BackendError::new("not connected"));
        }
        self.records.write().remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionData;

    #[tokio::test]
    async fn upsert_replaces_and_remove_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.connect().await.unwrap();

        let mut first = SessionData::default();
        first.set("user", "alice");
        backend
            .upsert(SessionRecord {
                id: "abc".to_string(),
                session: first,
                expires: None,
            })
            .await
            .unwrap();

        let mut second = SessionData::default();
        second.set("user", "bob");
        backend
            .upsert(SessionRecord {
                id: "abc".to_string(),
                session: second.clone(),
                expires: None,
            })
            .await
            .unwrap();

        assert_eq!(backend.len(), 1);
        let found = backend.find_one("abc").await.unwrap().unwrap();
        assert_eq!(found.session, second);

        backend.remove("abc").await.unwrap();
        backend.remove("abc").await.unwrap();
        assert!(backend.find_one("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn operations_require_connect() {
        let backend = MemoryBackend::new();
        assert!(backend.find_one("abc").await.is_err());

        backend.connect().await.unwrap();
        assert!(backend.find_one("abc").await.unwrap().is_none());
    }
}
