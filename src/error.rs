//! Store error types

use std::fmt;

/// Errors that can occur during store operations.
///
/// Each variant wraps the underlying database failure with the context of the
/// operation that hit it. Variants carry rendered messages rather than source
/// errors so the type stays `Clone` and can travel through the
/// connection-state and event channels.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Connecting to the database failed
    Connect(String),
    /// Creating the TTL index on the session collection failed
    CreateIndex(String),
    /// Looking up a session failed
    Find { id: String, message: String },
    /// Writing a session failed
    Set {
        id: String,
        payload: String,
        message: String,
    },
    /// Removing a session failed
    Destroy { id: String, message: String },
    /// The store never reached a usable connection; terminal for this instance
    NotInitialized(String),
    /// Error during serialization/deserialization
    Serialization(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Connect(msg) => write!(f, "error connecting to db: {}", msg),
            StoreError::CreateIndex(msg) => write!(f, "error creating index: {}", msg),
            StoreError::Find { id, message } => write!(f, "error finding {}: {}", id, message),
            StoreError::Set {
                id,
                payload,
                message,
            } => write!(f, "error setting {} to {}: {}", id, payload, message),
            StoreError::Destroy { id, message } => {
                write!(f, "error destroying {}: {}", id, message)
            }
            StoreError::NotInitialized(msg) => write!(f, "store failed to initialize: {}", msg),
            StoreError::Serialization(msg) => write!(f, "serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
