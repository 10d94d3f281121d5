//! Integration tests for full indexing cycles.
//!
//! These tests drive the public API end to end:
//! 1. Walk both listings
//! 2. Resolve and normalize profiles
//! 3. Persist into the next generation and build the caches
//! 4. Promote next → current → prior

use std::sync::Arc;

use name_indexer::{
    testing::{MockDirectory, MockResolver},
    CrawlConfig, Crawler, Cycle, DocumentStore, EntrySource, GenerationManager, MemoryStore,
    Scheduler, SearchProfileEntry, StoreIndexCycle,
};
use name_indexer::DocumentStoreExt;
use serde_json::json;
use std::time::Duration;

/// Helper to build a store cycle over mock services.
fn store_cycle(store: Arc<dyn DocumentStore>, names: Vec<Vec<String>>) -> StoreIndexCycle {
    let directory = MockDirectory::new()
        .with_names_pages(names)
        .with_subdomain_pages(vec![vec!["shop.alice.id".into()], vec![]]);
    let resolver = MockResolver::new()
        .with_profile(
            "alice.id",
            json!({
                "name": {"formatted": "Alice"},
                "account": [
                    {"service": "twitter", "identifier": "alice"},
                    {"service": "openbazaar", "identifier": "Qm1"}
                ],
                "$schema": "v1"
            }),
        )
        .with_profile("bob.id", json!({"name": "Bob", "links.home": "b.example"}))
        .with_failure("carol.id");

    let crawler = Crawler::new(
        Arc::new(directory),
        Arc::new(resolver),
        CrawlConfig::new().with_batch_size(2),
    );
    StoreIndexCycle::new(EntrySource::Crawl(crawler), GenerationManager::new(store))
}

#[tokio::test]
async fn test_full_cycle_publishes_search_index() {
    let store = Arc::new(MemoryStore::new());
    let cycle = store_cycle(
        store.clone(),
        vec![vec!["alice.id".into(), "bob.id".into()], vec!["carol.id".into()], vec![]],
    );

    let summary = cycle.run().await.unwrap();

    assert_eq!(summary.names, 4);
    assert_eq!(summary.entries, 3);
    assert_eq!(summary.resolution_errors, 1);

    let alice: SearchProfileEntry = store
        .get_as("search_db", "profiles", "alice.id")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alice.name.as_deref(), Some("alice"));
    assert_eq!(alice.social_handle.as_deref(), Some("alice"));
    assert_eq!(alice.openbazaar_identifier.as_deref(), Some("Qm1"));
    assert_eq!(alice.profile["_schema"], json!("v1"));

    let bob = store.get("search_db", "namespace", "bob.id").await.unwrap().unwrap();
    assert_eq!(bob["username"], json!("bob"));
    assert_eq!(bob["profile"]["links_home"], json!("b.example"));

    assert_eq!(
        store.get("search_cache", "username_cache", "username").await.unwrap(),
        Some(json!({"username": ["alice.id", "bob.id", "shop.alice.id"]}))
    );
    assert_eq!(
        store.get("search_cache", "people_cache", "name").await.unwrap(),
        Some(json!({"name": ["alice", "bob"]}))
    );
}

#[tokio::test]
async fn test_second_cycle_keeps_previous_as_prior() {
    let store = Arc::new(MemoryStore::new());

    store_cycle(store.clone(), vec![vec!["alice.id".into()], vec![]])
        .run()
        .await
        .unwrap();
    let first = store.dump("search_db").await;

    store_cycle(store.clone(), vec![vec!["alice.id".into(), "bob.id".into()], vec![]])
        .run()
        .await
        .unwrap();

    assert_eq!(store.dump("search_db_prior").await, first);
    assert_eq!(store.dump("search_db").await, store.dump("search_db_next").await);
    assert_eq!(store.count("search_db", "namespace").await.unwrap(), 3);
}

#[tokio::test]
async fn test_scheduler_one_shot_runs_store_cycle() {
    let store = Arc::new(MemoryStore::new());
    let cycle = store_cycle(store.clone(), vec![vec!["bob.id".into()], vec![]]);
    let scheduler = Scheduler::new(Arc::new(cycle), Duration::from_secs(60));

    let summary = scheduler.run_once().await.unwrap();

    assert_eq!(summary.cycle, "index");
    assert_eq!(summary.index.unwrap().profiles_written, 2);
}

#[cfg(feature = "sqlite")]
#[tokio::test]
async fn test_full_cycle_on_sqlite() {
    use name_indexer::SqliteStore;

    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    store_cycle(store.clone(), vec![vec!["alice.id".into(), "bob.id".into()], vec![]])
        .run()
        .await
        .unwrap();

    assert_eq!(store.count("search_db", "profiles").await.unwrap(), 3);
    assert_eq!(store.count("search_db_prior", "profiles").await.unwrap(), 0);
    assert_eq!(
        store.get("search_cache", "twitter_cache", "twitter_handle").await.unwrap(),
        Some(json!({"twitter_handle": ["alice"]}))
    );
}
