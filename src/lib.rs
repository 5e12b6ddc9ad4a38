//! # mongodb-session-store
//!
//! MongoDB-backed session store with express-session compatible semantics.
//!
//! Sessions are persisted one document per id in a configurable collection,
//! with a TTL index on the `expires` field so the database sweeps stale
//! sessions in the background; reads additionally remove expired sessions
//! they encounter, so callers never observe one.
//!
//! ## Features
//!
//! - **Express-session compatible documents**: `{_id, session, expires}`,
//!   interoperable with Node.js applications using connect-mongodb-session
//! - **Eager background connect**: the store is usable immediately after
//!   construction; operations wait on the connection becoming ready
//! - **Observable lifecycle**: subscribe to `Connected`/`Error` events, or
//!   query the connection state directly
//! - **Pluggable backend**: the database is a trait; an in-memory backend
//!   ships for development and testing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mongodb_session_store::{MongoDbStore, SessionData, SessionStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig::default()
//!         .with_uri("mongodb://localhost:27017/myapp")
//!         .with_collection("sessions");
//!     let store = MongoDbStore::new(config);
//!
//!     let mut session = SessionData::new(86400);
//!     session.set("user", "alice");
//!
//!     store.set("some-session-id", &session).await.unwrap();
//!     let found = store.get("some-session-id").await.unwrap();
//!     assert!(found.is_some());
//!     store.destroy("some-session-id").await.unwrap();
//! }
//! ```
//!
//! A failed connect leaves the store in a terminal `Failed` state that every
//! operation reports as an error; construct a new store to retry. There is
//! no reconnect logic and no close: the connection lives as long as the
//! store.

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod store;

pub use backend::{BackendError, MemoryBackend, MongoBackend, SessionBackend};
pub use config::StoreConfig;
pub use error::StoreError;
pub use events::{ConnectionState, StoreEvent};
pub use session::{SessionCookie, SessionData, SessionRecord};
pub use store::{MongoDbStore, SessionStore};
