//! Persistence sinks: JSON file artifacts or document-store generations.

use std::path::{Path, PathBuf};

use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info};

use crate::error::{IndexerError, Result};
use crate::pipeline::crawl::CrawlOutcome;
use crate::pipeline::normalize::normalize_document;
use crate::traits::store::{DocumentStore, DocumentStoreExt};
use crate::types::generation::collections;
use crate::types::profile::{NamespaceEntry, ProfileRecord, RawProfileEntry};

/// Upserts in flight at once when persisting entries.
const PERSIST_CONCURRENCY: usize = 32;

/// Writes crawl results to two JSON artifacts.
#[derive(Debug, Clone)]
pub struct FileSink {
    profiles_path: PathBuf,
    names_path: PathBuf,
}

impl FileSink {
    pub fn new(profiles_path: impl Into<PathBuf>, names_path: impl Into<PathBuf>) -> Self {
        Self {
            profiles_path: profiles_path.into(),
            names_path: names_path.into(),
        }
    }

    pub fn profiles_path(&self) -> &Path {
        &self.profiles_path
    }

    pub fn names_path(&self) -> &Path {
        &self.names_path
    }

    /// Check both targets are writable, creating missing parent directories.
    ///
    /// Run before any network work so a bad path fails the cycle early.
    pub async fn preflight(&self) -> Result<()> {
        ensure_writable(&self.profiles_path).await?;
        ensure_writable(&self.names_path).await
    }

    /// Rewrite both artifacts wholesale.
    pub async fn write(&self, outcome: &CrawlOutcome) -> Result<()> {
        let profiles: Vec<ProfileRecord> = outcome.entries.iter().map(|e| e.to_record()).collect();

        let profiles_json = serde_json::to_string_pretty(&profiles)?;
        let names_json = serde_json::to_string_pretty(&outcome.names)?;

        tokio::fs::write(&self.profiles_path, profiles_json).await?;
        tokio::fs::write(&self.names_path, names_json).await?;

        info!(
            profiles = profiles.len(),
            names = outcome.names.len(),
            profiles_path = %self.profiles_path.display(),
            names_path = %self.names_path.display(),
            "Wrote crawl artifacts"
        );
        Ok(())
    }

    /// Load artifacts written by [`FileSink::write`] back into a crawl outcome.
    ///
    /// Profiles are normalized again so hand-edited dumps are still safe to
    /// store.
    pub async fn load(&self) -> Result<CrawlOutcome> {
        let names_json = tokio::fs::read_to_string(&self.names_path).await?;
        let profiles_json = tokio::fs::read_to_string(&self.profiles_path).await?;

        let names: Vec<String> = serde_json::from_str(&names_json)?;
        let profiles: Vec<ProfileRecord> = serde_json::from_str(&profiles_json)?;

        let entries = profiles
            .into_iter()
            .map(|r| ProfileRecord::new(r.fqu, normalize_document(r.profile)))
            .map(NamespaceEntry::from_record)
            .collect::<Vec<_>>();

        info!(names = names.len(), entries = entries.len(), "Loaded crawl artifacts");

        Ok(CrawlOutcome {
            names,
            entries,
            error_count: 0,
        })
    }
}

/// Fail with [`IndexerError::PathNotWritable`] unless `path` can be written.
///
/// An existing path must be a writable file; an existing parent must be a
/// writable directory; missing parents are created.
pub async fn ensure_writable(path: &Path) -> Result<()> {
    if let Ok(meta) = tokio::fs::metadata(path).await {
        if !meta.is_file() || meta.permissions().readonly() {
            return Err(IndexerError::PathNotWritable {
                path: path.to_path_buf(),
            });
        }
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };

    match tokio::fs::metadata(parent).await {
        Ok(meta) => {
            if !meta.is_dir() || meta.permissions().readonly() {
                return Err(IndexerError::PathNotWritable {
                    path: parent.to_path_buf(),
                });
            }
        }
        Err(_) => {
            debug!(path = %parent.display(), "creating missing directory");
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|_| IndexerError::PathNotWritable {
                    path: parent.to_path_buf(),
                })?;
        }
    }

    Ok(())
}

/// Upsert every entry into `profile_data` and `namespace`, keyed by name.
///
/// All `profile_data` writes finish before the first `namespace` write.
pub async fn persist_entries<S>(store: &S, database: &str, entries: &[NamespaceEntry]) -> Result<()>
where
    S: DocumentStore + ?Sized,
{
    let raw_writes: Vec<_> = entries
        .iter()
        .map(|entry| persist_raw(store, database, entry))
        .collect();
    stream::iter(raw_writes)
        .buffer_unordered(PERSIST_CONCURRENCY)
        .try_collect::<Vec<()>>()
        .await?;

    let namespace_writes: Vec<_> = entries
        .iter()
        .map(|entry| store.upsert_as(database, collections::NAMESPACE, &entry.fqu, entry))
        .collect();
    stream::iter(namespace_writes)
        .buffer_unordered(PERSIST_CONCURRENCY)
        .try_collect::<Vec<()>>()
        .await?;

    info!(entries = entries.len(), database, "Persisted namespace entries");
    Ok(())
}

async fn persist_raw<S>(store: &S, database: &str, entry: &NamespaceEntry) -> Result<()>
where
    S: DocumentStore + ?Sized,
{
    let raw = RawProfileEntry {
        key: entry.fqu.clone(),
        value: entry.profile.clone(),
    };
    store
        .upsert_as(database, collections::PROFILE_DATA, &entry.fqu, &raw)
        .await
}
