//! SQLite storage implementation.
//!
//! A file-based document store. All databases live in one `documents`
//! table keyed by `(db, collection, key)`, so dropping or copying a
//! database is a single statement (or a single transaction) and therefore
//! atomic for concurrent readers.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::error::{IndexerError, Result};
use crate::traits::store::DocumentStore;

/// SQLite-based document store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store with the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite://search_index.db?mode=rwc` - Create if not exists
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(IndexerError::storage)?;

        Self::with_pool(pool).await
    }

    /// Create an in-memory SQLite store (for testing).
    ///
    /// Uses a single connection: every `:memory:` connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(IndexerError::storage)?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run database migrations.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                db TEXT NOT NULL,
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                doc TEXT NOT NULL,
                PRIMARY KEY (db, collection, key)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(IndexerError::storage)?;

        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        doc: &Value,
    ) -> Result<()> {
        let doc = serde_json::to_string(doc)?;
        sqlx::query(
            r#"
            INSERT INTO documents (db, collection, key, doc)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (db, collection, key) DO UPDATE SET doc = excluded.doc
            "#,
        )
        .bind(database)
        .bind(collection)
        .bind(key)
        .bind(doc)
        .execute(&self.pool)
        .await
        .map_err(IndexerError::storage)?;

        Ok(())
    }

    async fn get(&self, database: &str, collection: &str, key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT doc FROM documents WHERE db = ? AND collection = ? AND key = ?",
        )
        .bind(database)
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(IndexerError::storage)?;

        match row {
            Some((doc,)) => Ok(Some(serde_json::from_str(&doc)?)),
            None => Ok(None),
        }
    }

    async fn scan(&self, database: &str, collection: &str) -> Result<Vec<(String, Value)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, doc FROM documents WHERE db = ? AND collection = ? ORDER BY key",
        )
        .bind(database)
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(IndexerError::storage)?;

        rows.into_iter()
            .map(|(key, doc)| Ok((key, serde_json::from_str(&doc)?)))
            .collect()
    }

    async fn count(&self, database: &str, collection: &str) -> Result<usize> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM documents WHERE db = ? AND collection = ?")
                .bind(database)
                .bind(collection)
                .fetch_one(&self.pool)
                .await
                .map_err(IndexerError::storage)?;

        Ok(count as usize)
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM documents WHERE db = ? LIMIT 1")
            .bind(database)
            .fetch_optional(&self.pool)
            .await
            .map_err(IndexerError::storage)?;

        Ok(row.is_some())
    }

    async fn drop_database(&self, database: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE db = ?")
            .bind(database)
            .execute(&self.pool)
            .await
            .map_err(IndexerError::storage)?;

        Ok(())
    }

    async fn copy_database(&self, from: &str, to: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(IndexerError::storage)?;

        sqlx::query("DELETE FROM documents WHERE db = ?")
            .bind(to)
            .execute(&mut *tx)
            .await
            .map_err(IndexerError::storage)?;

        sqlx::query(
            r#"
            INSERT INTO documents (db, collection, key, doc)
            SELECT ?, collection, key, doc FROM documents WHERE db = ?
            "#,
        )
        .bind(to)
        .bind(from)
        .execute(&mut *tx)
        .await
        .map_err(IndexerError::storage)?;

        tx.commit().await.map_err(IndexerError::storage)?;
        Ok(())
    }
}
