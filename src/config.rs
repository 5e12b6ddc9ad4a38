//! Store configuration

use std::time::Duration;

use mongodb::options::ClientOptions;

/// Default connection target.
pub const DEFAULT_URI: &str = "mongodb://localhost:27017/test";

/// Default collection holding session documents.
pub const DEFAULT_COLLECTION: &str = "sessions";

/// Default field used as the record primary key.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Default session lifetime: 2 weeks.
pub const DEFAULT_EXPIRES: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Configuration for the MongoDB session store.
///
/// Built once from [`Default`] plus `with_*` setters and immutable afterwards.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Connection string (default: "mongodb://localhost:27017/test").
    /// The database is taken from the URI path, falling back to `test`.
    pub uri: String,

    /// Collection name for session documents (default: "sessions")
    pub collection: String,

    /// Pre-built driver options, passed through opaquely.
    /// When set, these take precedence over `uri`.
    pub client_options: Option<ClientOptions>,

    /// Lifetime applied to sessions whose cookie carries no explicit
    /// expiration (default: 14 days)
    pub expires: Duration,

    /// Field name used as the record primary key (default: "_id")
    pub id_field: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            client_options: None,
            expires: DEFAULT_EXPIRES,
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection URI (default: "mongodb://localhost:27017/test")
    pub fn with_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.uri = uri.into();
        self
    }

    /// Set the session collection name (default: "sessions")
    pub fn with_collection<S: Into<String>>(mut self, collection: S) -> Self {
        self.collection = collection.into();
        self
    }

    /// Pass pre-built driver options through to the client.
    ///
    /// Takes precedence over [`with_uri`](Self::with_uri).
    pub fn with_client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = Some(options);
        self
    }

    /// Set the default session lifetime (default: 14 days)
    pub fn with_expires(mut self, expires: Duration) -> Self {
        self.expires = expires;
        self
    }

    /// Set the primary-key field name (default: "_id")
    pub fn with_id_field<S: Into<String>>(mut self, id_field: S) -> Self {
        self.id_field = id_field.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = StoreConfig::default();
        assert_eq!(config.uri, "mongodb://localhost:27017/test");
        assert_eq!(config.collection, "sessions");
        assert!(config.client_options.is_none());
        assert_eq!(config.expires, Duration::from_secs(60 * 60 * 24 * 14));
        assert_eq!(config.id_field, "_id");
    }

    #[test]
    fn setters_override_defaults() {
        let config = StoreConfig::new()
            .with_uri("mongodb://db.internal:27017/app")
            .with_collection("app_sessions")
            .with_expires(Duration::from_secs(3600))
            .with_id_field("sid");
        assert_eq!(config.uri, "mongodb://db.internal:27017/app");
        assert_eq!(config.collection, "app_sessions");
        assert_eq!(config.expires, Duration::from_secs(3600));
        assert_eq!(config.id_field, "sid");
    }
}
