//! In-memory storage implementation for testing and development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::traits::store::DocumentStore;

type Collection = BTreeMap<String, Value>;
type Database = HashMap<String, Collection>;

/// In-memory document store.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart. Every operation holds the single write lock,
/// so drops and copies are atomic with respect to readers.
#[derive(Default)]
pub struct MemoryStore {
    databases: RwLock<HashMap<String, Database>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all databases that currently exist.
    pub async fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Snapshot of a whole database, for assertions.
    pub async fn dump(&self, database: &str) -> BTreeMap<String, Collection> {
        self.databases
            .read()
            .await
            .get(database)
            .map(|db| db.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upsert(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        doc: &Value,
    ) -> Result<()> {
        self.databases
            .write()
            .await
            .entry(database.to_string())
            .or_default()
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc.clone());
        Ok(())
    }

    async fn get(&self, database: &str, collection: &str, key: &str) -> Result<Option<Value>> {
        Ok(self
            .databases
            .read()
            .await
            .get(database)
            .and_then(|db| db.get(collection))
            .and_then(|c| c.get(key))
            .cloned())
    }

    async fn scan(&self, database: &str, collection: &str) -> Result<Vec<(String, Value)>> {
        Ok(self
            .databases
            .read()
            .await
            .get(database)
            .and_then(|db| db.get(collection))
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn count(&self, database: &str, collection: &str) -> Result<usize> {
        Ok(self
            .databases
            .read()
            .await
            .get(database)
            .and_then(|db| db.get(collection))
            .map(|c| c.len())
            .unwrap_or(0))
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        Ok(self
            .databases
            .read()
            .await
            .get(database)
            .is_some_and(|db| db.values().any(|c| !c.is_empty())))
    }

    async fn drop_database(&self, database: &str) -> Result<()> {
        self.databases.write().await.remove(database);
        Ok(())
    }

    async fn copy_database(&self, from: &str, to: &str) -> Result<()> {
        let mut databases = self.databases.write().await;
        match databases.get(from).cloned() {
            Some(db) => {
                databases.insert(to.to_string(), db);
            }
            None => {
                databases.remove(to);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_is_last_write_wins() {
        let store = MemoryStore::new();
        store.upsert("db", "c", "k", &json!({"v": 1})).await.unwrap();
        store.upsert("db", "c", "k", &json!({"v": 2})).await.unwrap();

        assert_eq!(store.count("db", "c").await.unwrap(), 1);
        assert_eq!(store.get("db", "c", "k").await.unwrap(), Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_copy_replaces_target() {
        let store = MemoryStore::new();
        store.upsert("a", "c", "k1", &json!(1)).await.unwrap();
        store.upsert("b", "c", "stale", &json!(0)).await.unwrap();

        store.copy_database("a", "b").await.unwrap();

        assert_eq!(store.dump("b").await, store.dump("a").await);
        assert!(store.get("b", "c", "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_copy_from_missing_clears_target() {
        let store = MemoryStore::new();
        store.upsert("b", "c", "k", &json!(0)).await.unwrap();

        store.copy_database("missing", "b").await.unwrap();

        assert!(!store.database_exists("b").await.unwrap());
    }

    #[tokio::test]
    async fn test_drop_missing_database_is_ok() {
        let store = MemoryStore::new();
        store.drop_database("nope").await.unwrap();
        assert!(store.database_names().await.is_empty());
    }
}
