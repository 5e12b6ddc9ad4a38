//! Connection lifecycle state and events

use crate::error::StoreError;

/// State of the store's single database connection.
///
/// Moves away from `Connecting` exactly once and never reverts. `Failed` is
/// terminal: the store holds no usable connection and every operation will
/// reject with [`StoreError::NotInitialized`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConnectionState {
    /// The background connect task has not finished yet
    Connecting,
    /// Connected and the TTL index exists; operations proceed immediately
    Ready,
    /// Connecting or index creation failed; no retry is attempted
    Failed(StoreError),
}

impl ConnectionState {
    /// Whether the connection is usable.
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }
}

/// Lifecycle events observable through [`MongoDbStore::subscribe`].
///
/// Events are broadcast: they reach subscribers that exist at emission time
/// and are dropped otherwise, so an unobserved failure never escalates.
///
/// [`MongoDbStore::subscribe`]: crate::store::MongoDbStore::subscribe
#[derive(Clone, Debug)]
pub enum StoreEvent {
    /// Fired once, after the TTL index has been created
    Connected,
    /// Fired on any internal failure
    Error(StoreError),
}
