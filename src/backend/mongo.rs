//! MongoDB backend
//!
//! Stores one document per session in the configured collection:
//! - `<id_field>`: the session id (default `_id`)
//! - `session`: the serialized payload
//! - `expires`: absolute expiration timestamp, carrying the TTL index

use mongodb::bson::{self, doc, Bson, Document};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use parking_lot::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendError, SessionBackend};
use crate::config::StoreConfig;
use crate::session::{SessionData, SessionRecord};

const SESSION_FIELD: &str = "session";
const EXPIRES_FIELD: &str = "expires";

/// Database used when the URI carries no default database.
const DEFAULT_DATABASE: &str = "test";

/// Session backend over the MongoDB driver.
///
/// The collection handle is populated by [`connect`](SessionBackend::connect)
/// and held for the backend's lifetime; there is no reconnect and no close.
pub struct MongoBackend {
    config: StoreConfig,
    collection: RwLock<Option<Collection<Document>>>,
}

impl MongoBackend {
    /// Create a backend for the given configuration. No I/O happens until
    /// `connect` is called.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            collection: RwLock::new(None),
        }
    }

    fn collection(&self) -> Result<Collection<Document>, BackendError> {
        self.collection
            .read()
            .clone()
            .ok_or_else(|| BackendError::new("not connected"))
    }

    fn id_filter(&self, id: &str) -> Document {
        let mut filter = Document::new();
        filter.insert(self.config.id_field.as_str(), id);
        filter
    }

    fn record_to_document(&self, record: &SessionRecord) -> Result<Document, BackendError> {
        let mut document = Document::new();
        document.insert(self.config.id_field.as_str(), record.id.as_str());
        document.insert(SESSION_FIELD, bson::to_bson(&record.session)?);
        if let Some(expires) = record.expires {
            document.insert(
                EXPIRES_FIELD,
                Bson::DateTime(bson::DateTime::from_chrono(expires)),
            );
        }
        Ok(document)
    }

    fn document_to_record(&self, document: Document) -> Result<SessionRecord, BackendError> {
        let id = document
            .get_str(&self.config.id_field)
            .unwrap_or_default()
            .to_string();
        let session: SessionData = match document.get(SESSION_FIELD) {
            Some(value) => bson::from_bson(value.clone())?,
            None => SessionData::default(),
        };
        let expires = match document.get(EXPIRES_FIELD) {
            Some(Bson::DateTime(datetime)) => Some(datetime.to_chrono()),
            _ => None,
        };
        Ok(SessionRecord {
            id,
            session,
            expires,
        })
    }
}

#[async_trait]
impl SessionBackend for MongoBackend {
    async fn connect(&self) -> Result<(), BackendError> {
        let options = match self.config.client_options.clone() {
            Some(options) => options,
            None => ClientOptions::parse(&self.config.uri).await?,
        };
        let client = Client::with_options(options)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(DEFAULT_DATABASE));

        // The driver connects lazily; ping so a bad target fails here rather
        // than on the first session operation.
        database.run_command(doc! { "ping": 1 }).await?;

        let collection = database.collection::<Document>(&self.config.collection);
        *self.collection.write() = Some(collection);
        Ok(())
    }

    async fn ensure_expires_index(&self) -> Result<(), BackendError> {
        let collection = self.collection()?;
        let options = IndexOptions::builder()
            .expire_after(Duration::from_secs(0))
            .build();
        let index = IndexModel::builder()
            .keys(doc! { EXPIRES_FIELD: 1 })
            .options(options)
            .build();
        collection.create_index(index).await?;
        Ok(())
    }

    async fn find_one(&self, id: &str) -> Result<Option<SessionRecord>, BackendError> {
        let collection = self.collection()?;
        let found = collection.find_one(self.id_filter(id)).await?;
        found
            .map(|document| self.document_to_record(document))
            .transpose()
    }

    async fn upsert(&self, record: SessionRecord) -> Result<(), BackendError> {
        let collection = self.collection()?;
        let document = self.record_to_document(&record)?;
        collection
            .replace_one(self.id_filter(&record.id), document)
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), BackendError> {
        let collection = self.collection()?;
        collection.delete_one(self.id_filter(id)).await?;
        Ok(())
    }
}

impl From<mongodb::error::Error> for BackendError {
    fn from(err: mongodb::error::Error) -> Self {
        BackendError::new(err.to_string())
    }
}

impl From<bson::ser::Error> for BackendError {
    fn from(err: bson::ser::Error) -> Self {
        BackendError::new(err.to_string())
    }
}

impl From<bson::de::Error> for BackendError {
    fn from(err: bson::de::Error) -> Self {
        BackendError::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    // Tests require a running MongoDB instance
    // Run with: cargo test -- --ignored

    use super::*;
    use chrono::Utc;

    #[tokio::test]
    #[ignore]
    async fn mongo_backend_round_trip() {
        let config = StoreConfig::default().with_collection("mongo_backend_test");
        let backend = MongoBackend::new(config);

        backend.connect().await.unwrap();
        backend.ensure_expires_index().await.unwrap();

        let mut session = SessionData::default();
        session.set("user", "alice");
        let record = SessionRecord {
            id: "round-trip".to_string(),
            session: session.clone(),
            expires: Some(Utc::now() + chrono::Duration::hours(1)),
        };

        backend.upsert(record.clone()).await.unwrap();

        let found = backend.find_one("round-trip").await.unwrap().unwrap();
        assert_eq!(found.id, "round-trip");
        assert_eq!(found.session, session);
        assert!(found.expires.is_some());

        backend.remove("round-trip").await.unwrap();
        assert!(backend.find_one("round-trip").await.unwrap().is_none());
    }
}
