//! MongoDB-backed session store
//!
//! Storage format, one document per session:
//! - Key: the configured id field (default `_id`) holding the session id
//! - Value: `session` (serialized payload) and `expires` (absolute timestamp)
//! - TTL: an `expireAfterSeconds: 0` index on `expires`, so the database
//!   background-deletes whatever the lazy cleanup on read has not already

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, watch};

use super::SessionStore;
use crate::backend::{MongoBackend, SessionBackend};
use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::events::{ConnectionState, StoreEvent};
use crate::session::{SessionData, SessionRecord};

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// MongoDB-backed session store.
///
/// Construction starts a background task that connects, creates the TTL
/// index, then flips the store's [`ConnectionState`] to `Ready`, releasing
/// every operation issued in the meantime. A connect or index failure is
/// terminal for the instance: the state becomes `Failed`, pending and future
/// operations reject with [`StoreError::NotInitialized`], and callers retry
/// by constructing a new store. There is no reconnect and no close.
///
/// Must be constructed from within a Tokio runtime.
///
/// # Example
///
/// ```rust,ignore
/// use mongodb_session_store::{MongoDbStore, SessionData, SessionStore, StoreConfig};
///
/// let store = MongoDbStore::new(StoreConfig::default());
/// let mut session = SessionData::new(3600);
/// session.set("user", "alice");
/// store.set("some-session-id", &session).await?;
/// ```
pub struct MongoDbStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    config: StoreConfig,
    backend: Arc<dyn SessionBackend>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<StoreEvent>,
}

impl StoreInner {
    /// Single reporting path for every internal failure: log, publish to
    /// subscribers (dropped when nobody listens), hand back for rejection.
    fn report(&self, error: StoreError) -> StoreError {
        tracing::error!("{}", error);
        let _ = self.events.send(StoreEvent::Error(error.clone()));
        error
    }
}

impl MongoDbStore {
    /// Create a store over the MongoDB backend and start connecting.
    pub fn new(config: StoreConfig) -> Self {
        let backend = Arc::new(MongoBackend::new(config.clone()));
        Self::with_backend(config, backend)
    }

    /// Create a store over a custom backend and start connecting.
    pub fn with_backend(config: StoreConfig, backend: Arc<dyn SessionBackend>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(StoreInner {
            config,
            backend,
            state: state_rx,
            events: events_tx,
        });
        spawn_connect(Arc::clone(&inner), state_tx);
        Self { inner }
    }

    /// Subscribe to connection lifecycle events.
    ///
    /// `Connected` fires once; `Error` fires on every internal failure that
    /// happens while at least one subscriber exists. Subscribe before the
    /// first await after construction to observe connect failures.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Whether the connection is established and usable.
    pub fn is_connected(&self) -> bool {
        self.state().is_ready()
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Wait for the connection state to leave `Connecting`.
    ///
    /// There is no timeout on this wait; it ends when the background connect
    /// task publishes `Ready` or `Failed`.
    async fn await_ready(&self) -> Result<(), StoreError> {
        let mut state = self.inner.state.clone();
        loop {
            match &*state.borrow_and_update() {
                ConnectionState::Ready => return Ok(()),
                ConnectionState::Failed(error) => {
                    return Err(StoreError::NotInitialized(error.to_string()));
                }
                ConnectionState::Connecting => {}
            }
            if state.changed().await.is_err() {
                // Connect task died without publishing a state.
                return Err(StoreError::NotInitialized(
                    "connection task stopped".to_string(),
                ));
            }
        }
    }
}

/// Connect, ensure the TTL index, publish readiness. Runs once per store.
fn spawn_connect(inner: Arc<StoreInner>, state: watch::Sender<ConnectionState>) {
    tokio::spawn(async move {
        let result = async {
            inner
                .backend
                .connect()
                .await
                .map_err(|e| StoreError::Connect(e.to_string()))?;
            inner
                .backend
                .ensure_expires_index()
                .await
                .map_err(|e| StoreError::CreateIndex(e.to_string()))?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::debug!(
                    collection = %inner.config.collection,
                    "session store connected"
                );
                let _ = state.send(ConnectionState::Ready);
                let _ = inner.events.send(StoreEvent::Connected);
            }
            Err(error) => {
                let error = inner.report(error);
                let _ = state.send(ConnectionState::Failed(error));
            }
        }
    });
}

impl Clone for MongoDbStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl SessionStore for MongoDbStore {
    async fn get(&self, id: &str) -> Result<Option<SessionData>, StoreError> {
        self.await_ready().await?;

        let record = match self.inner.backend.find_one(id).await {
            Ok(found) => found,
            Err(e) => {
                return Err(self.inner.report(StoreError::Find {
                    id: id.to_string(),
                    message: e.to_string(),
                }));
            }
        };

        match record {
            None => Ok(None),
            Some(record) if record.is_expired(Utc::now()) => {
                // Lazy cleanup: the TTL index only sweeps in the background.
                self.destroy(id).await?;
                Ok(None)
            }
            Some(record) => Ok(Some(record.session)),
        }
    }

    async fn set(&self, id: &str, session: &SessionData) -> Result<(), StoreError> {
        self.await_ready().await?;

        let expires = match session.cookie.expires {
            Some(expires) => expires,
            None => {
                let lifetime = chrono::Duration::from_std(self.inner.config.expires)
                    .unwrap_or_else(|_| chrono::Duration::days(14));
                Utc::now() + lifetime
            }
        };

        let record = SessionRecord {
            id: id.to_string(),
            session: session.clone(),
            expires: Some(expires),
        };

        if let Err(e) = self.inner.backend.upsert(record).await {
            let payload =
                serde_json::to_string(session).unwrap_or_else(|_| format!("{:?}", session));
            return Err(self.inner.report(StoreError::Set {
                id: id.to_string(),
                payload,
                message: e.to_string(),
            }));
        }
        Ok(())
    }

    async fn destroy(&self, id: &str) -> Result<(), StoreError> {
        self.await_ready().await?;

        if let Err(e) = self.inner.backend.remove(id).await {
            return Err(self.inner.report(StoreError::Destroy {
                id: id.to_string(),
                message: e.to_string(),
            }));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MemoryBackend};
    use tokio::sync::Notify;

    /// Backend whose connect blocks until the gate is notified.
    struct GatedBackend {
        inner: MemoryBackend,
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl SessionBackend for GatedBackend {
        async fn connect(&self) -> Result<(), BackendError> {
            self.gate.notified().await;
            self.inner.connect().await
        }

        async fn ensure_expires_index(&self) -> Result<(), BackendError> {
            self.inner.ensure_expires_index().await
        }

        async fn find_one(&self, id: &str) -> Result<Option<SessionRecord>, BackendError> {
            self.inner.find_one(id).await
        }

        async fn upsert(&self, record: SessionRecord) -> Result<(), BackendError> {
            self.inner.upsert(record).await
        }

        async fn remove(&self, id: &str) -> Result<(), BackendError> {
            self.inner.remove(id).await
        }
    }

    /// Backend that refuses to connect.
    struct UnreachableBackend;

    #[async_trait]
    impl SessionBackend for UnreachableBackend {
        async fn connect(&self) -> Result<(), BackendError> {
            Err(BackendError::new("connection refused"))
        }

        async fn ensure_expires_index(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn find_one(&self, _id: &str) -> Result<Option<SessionRecord>, BackendError> {
            Err(BackendError::new("not connected"))
        }

        async fn upsert(&self, _record: SessionRecord) -> Result<(), BackendError> {
            Err(BackendError::new("not connected"))
        }

        async fn remove(&self, _id: &str) -> Result<(), BackendError> {
            Err(BackendError::new("not connected"))
        }
    }

    /// Backend that connects fine but fails every data operation.
    struct BrokenOpsBackend;

    #[async_trait]
    impl SessionBackend for BrokenOpsBackend {
        async fn connect(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn ensure_expires_index(&self) -> Result<(), BackendError> {
            Ok(())
        }

        async fn find_one(&self, _id: &str) -> Result<Option<SessionRecord>, BackendError> {
            Err(BackendError::new("boom"))
        }

        async fn upsert(&self, _record: SessionRecord) -> Result<(), BackendError> {
            Err(BackendError::new("boom"))
        }

        async fn remove(&self, _id: &str) -> Result<(), BackendError> {
            Err(BackendError::new("boom"))
        }
    }

    fn memory_store() -> (MongoDbStore, MemoryBackend) {
        let backend = MemoryBackend::new();
        let store =
            MongoDbStore::with_backend(StoreConfig::default(), Arc::new(backend.clone()));
        (store, backend)
    }

    fn payload(user: &str) -> SessionData {
        let mut session = SessionData::default();
        session.set("user", user);
        session
    }

    #[tokio::test]
    async fn get_of_unknown_id_resolves_absent() {
        let (store, _) = memory_store();
        assert_eq!(store.get("never-stored").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips_with_future_expiry() {
        let (store, backend) = memory_store();
        let session = payload("x");

        store.set("abc", &session).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), Some(session));

        let record = backend.record("abc").unwrap();
        assert!(record.expires.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn explicit_cookie_expiration_wins_over_default() {
        let (store, backend) = memory_store();
        let explicit = Utc::now() + chrono::Duration::hours(1);
        let mut session = payload("x");
        session.cookie.expires = Some(explicit);

        store.set("abc", &session).await.unwrap();
        assert_eq!(backend.record("abc").unwrap().expires, Some(explicit));
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let (store, _) = memory_store();
        store.destroy("never-stored").await.unwrap();
        store.destroy("never-stored").await.unwrap();

        store.set("abc", &payload("x")).await.unwrap();
        store.destroy("abc").await.unwrap();
        store.destroy("abc").await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_session_is_removed_on_read() {
        let (store, backend) = memory_store();
        let mut session = payload("x");
        session.cookie.expires = Some(Utc::now() - chrono::Duration::seconds(1));

        store.set("abc", &session).await.unwrap();
        assert!(backend.contains("abc"));

        assert_eq!(store.get("abc").await.unwrap(), None);
        assert!(!backend.contains("abc"));
    }

    #[tokio::test]
    async fn set_replaces_rather_than_merges() {
        let (store, _) = memory_store();
        let mut first = payload("x");
        first.set("theme", "dark");
        store.set("abc", &first).await.unwrap();

        let second = payload("y");
        store.set("abc", &second).await.unwrap();

        let found = store.get("abc").await.unwrap().unwrap();
        assert_eq!(found, second);
        assert!(!found.contains("theme"));
    }

    #[tokio::test]
    async fn operations_issued_before_readiness_resolve_after_it() {
        let gate = Arc::new(Notify::new());
        let backend = MemoryBackend::new();
        let store = MongoDbStore::with_backend(
            StoreConfig::default(),
            Arc::new(GatedBackend {
                inner: backend.clone(),
                gate: Arc::clone(&gate),
            }),
        );

        let reader = store.clone();
        let get_task = tokio::spawn(async move { reader.get("missing").await });
        let writer = store.clone();
        let set_task = tokio::spawn(async move { writer.set("later", &payload("x")).await });

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.state(), ConnectionState::Connecting);

        gate.notify_one();

        assert_eq!(get_task.await.unwrap().unwrap(), None);
        set_task.await.unwrap().unwrap();
        assert_eq!(store.get("later").await.unwrap(), Some(payload("x")));
        assert!(store.is_connected());
    }

    #[tokio::test]
    async fn connected_event_fires_once_after_index_creation() {
        let (store, _) = memory_store();
        let mut events = store.subscribe();

        assert!(matches!(events.recv().await.unwrap(), StoreEvent::Connected));
        store.set("abc", &payload("x")).await.unwrap();
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_connect_is_terminal_and_observable() {
        let store =
            MongoDbStore::with_backend(StoreConfig::default(), Arc::new(UnreachableBackend));
        let mut events = store.subscribe();

        match events.recv().await.unwrap() {
            StoreEvent::Error(error) => {
                assert_eq!(
                    error.to_string(),
                    "error connecting to db: connection refused"
                );
            }
            other => panic!("expected error event, got {:?}", other),
        }

        assert!(matches!(store.state(), ConnectionState::Failed(_)));

        let error = store.get("abc").await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "store failed to initialize: error connecting to db: connection refused"
        );
        assert!(store.set("abc", &payload("x")).await.is_err());
        assert!(store.destroy("abc").await.is_err());
    }

    #[tokio::test]
    async fn operation_errors_reject_and_emit() {
        let store =
            MongoDbStore::with_backend(StoreConfig::default(), Arc::new(BrokenOpsBackend));
        let mut events = store.subscribe();
        assert!(matches!(events.recv().await.unwrap(), StoreEvent::Connected));

        let error = store.get("abc").await.unwrap_err();
        assert_eq!(error.to_string(), "error finding abc: boom");
        assert!(matches!(
            events.recv().await.unwrap(),
            StoreEvent::Error(StoreError::Find { .. })
        ));

        let error = store.set("abc", &payload("x")).await.unwrap_err();
        let rendered = error.to_string();
        assert!(rendered.starts_with("error setting abc to "));
        assert!(rendered.ends_with(": boom"));

        let error = store.destroy("abc").await.unwrap_err();
        assert_eq!(error.to_string(), "error destroying abc: boom");
    }

    // The concrete end-to-end sequence from the middleware's point of view.
    #[tokio::test]
    async fn session_lifecycle() {
        let (store, _) = memory_store();

        let session = payload("x");
        store.set("abc", &session).await.unwrap();

        let found = store.get("abc").await.unwrap().unwrap();
        assert_eq!(found.get::<String>("user"), Some("x".to_string()));
        assert_eq!(found.cookie, session.cookie);

        store.destroy("abc").await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), None);
    }
}
