//! Basic store usage against a local MongoDB
//!
//! Run with: cargo run --example basic

use mongodb_session_store::{MongoDbStore, SessionData, SessionStore, StoreConfig, StoreEvent};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = StoreConfig::default().with_uri("mongodb://localhost:27017/demo");
    let store = MongoDbStore::new(config);

    // Watch the connection lifecycle. Subscribing before the first await
    // guarantees we see the Connected event (or the connect failure).
    let mut events = store.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                StoreEvent::Connected => println!("store connected"),
                StoreEvent::Error(error) => eprintln!("store error: {}", error),
            }
        }
    });

    // One day of lifetime, carried by the session cookie.
    let mut session = SessionData::new(86400);
    session.set("user", "alice");
    session.set("views", 1);

    store
        .set("demo-session", &session)
        .await
        .expect("failed to store session");

    let found = store
        .get("demo-session")
        .await
        .expect("failed to load session")
        .expect("session should exist");
    println!(
        "loaded session for user {:?}, expires {:?}",
        found.get::<String>("user"),
        found.cookie.expires
    );

    store
        .destroy("demo-session")
        .await
        .expect("failed to destroy session");

    let gone = store.get("demo-session").await.expect("failed to re-check");
    println!("after destroy: {:?}", gone);
}
