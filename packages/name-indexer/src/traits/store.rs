//! Document store trait.
//!
//! The store is organized as named databases, each holding named
//! collections of JSON documents addressed by a string key. Generations
//! are rotated by dropping and copying whole databases, so backends must
//! make `drop_database` and `copy_database` atomic per call.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Generic document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the document stored under `key`. Last write wins.
    async fn upsert(&self, database: &str, collection: &str, key: &str, doc: &Value)
        -> Result<()>;

    /// Fetch a single document.
    async fn get(&self, database: &str, collection: &str, key: &str) -> Result<Option<Value>>;

    /// All `(key, document)` pairs of a collection, in key order.
    async fn scan(&self, database: &str, collection: &str) -> Result<Vec<(String, Value)>>;

    /// Number of documents in a collection.
    async fn count(&self, database: &str, collection: &str) -> Result<usize> {
        Ok(self.scan(database, collection).await?.len())
    }

    /// Whether a database holds at least one document.
    async fn database_exists(&self, database: &str) -> Result<bool>;

    /// Remove a database and every collection in it. Dropping a missing
    /// database is not an error.
    async fn drop_database(&self, database: &str) -> Result<()>;

    /// Replace `to` with a full copy of `from`. A missing `from` leaves `to`
    /// empty.
    async fn copy_database(&self, from: &str, to: &str) -> Result<()>;
}

/// Typed helpers over any [`DocumentStore`].
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Serialize and upsert a value.
    async fn upsert_as<T: Serialize + Sync>(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        value: &T,
    ) -> Result<()> {
        let doc = serde_json::to_value(value)?;
        self.upsert(database, collection, key, &doc).await
    }

    /// Fetch and deserialize a document.
    async fn get_as<T: DeserializeOwned + Send>(
        &self,
        database: &str,
        collection: &str,
        key: &str,
    ) -> Result<Option<T>> {
        match self.get(database, collection, key).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}

// Blanket implementation
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
