//! Database backends

use std::fmt;

use async_trait::async_trait;

use crate::session::SessionRecord;

mod memory;
mod mongo;

pub use memory::MemoryBackend;
pub use mongo::MongoBackend;

/// Error raised by a backend, before operation context is attached.
///
/// The store wraps these with the failing operation's context (connect,
/// index, find, set, destroy) to produce its [`StoreError`] variants.
///
/// [`StoreError`]: crate::error::StoreError
#[derive(Debug, Clone)]
pub struct BackendError(String);

impl BackendError {
    /// Create a backend error from any displayable message.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

/// The database capability the session store is built on.
///
/// Implementations hold a single connection for the lifetime of the store.
/// `connect` and `ensure_expires_index` are each called exactly once, from
/// the store's background connect task, before any data operation runs.
#[async_trait]
pub trait SessionBackend: Send + Sync + 'static {
    /// Establish the connection. A failed attempt is terminal; the store
    /// never retries.
    async fn connect(&self) -> Result<(), BackendError>;

    /// Idempotently create the TTL index on the `expires` field, so the
    /// database background-deletes documents once that timestamp passes.
    async fn ensure_expires_index(&self) -> Result<(), BackendError>;

    /// Look up the unique record for `id`.
    async fn find_one(&self, id: &str) -> Result<Option<SessionRecord>, BackendError>;

    /// Insert-or-replace the record keyed by its id. A prior record for the
    /// same id is fully replaced, not merged.
    async fn upsert(&self, record: SessionRecord) -> Result<(), BackendError>;

    /// Remove the record for `id`. Removing an absent record succeeds.
    async fn remove(&self, id: &str) -> Result<(), BackendError>;
}
