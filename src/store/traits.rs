//! Session store trait

use crate::error::StoreError;
use crate::session::SessionData;
use async_trait::async_trait;

/// The contract session middleware programs against.
///
/// Every operation returns a future that resolves once the store's
/// connection is usable; operations issued before then are queued on the
/// readiness signal rather than failing.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Get a session by id
    ///
    /// Returns `None` for unknown ids and for sessions found expired (which
    /// are removed as a side effect).
    async fn get(&self, id: &str) -> Result<Option<SessionData>, StoreError>;

    /// Insert or fully replace the session stored under `id`
    ///
    /// The record's expiration is the payload cookie's `expires` when set,
    /// otherwise now plus the configured default lifetime.
    async fn set(&self, id: &str, session: &SessionData) -> Result<(), StoreError>;

    /// Delete the session stored under `id`
    ///
    /// Deleting an absent session succeeds.
    async fn destroy(&self, id: &str) -> Result<(), StoreError>;
}
