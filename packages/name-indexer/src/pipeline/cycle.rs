//! Indexing cycles: one end-to-end run of the pipeline.
//!
//! Two cycles exist:
//! - [`FileDumpCycle`] crawls and rewrites the JSON artifacts.
//! - [`StoreIndexCycle`] crawls (or loads the artifacts), persists into the
//!   `next` generation, builds the search index and promotes it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::error::{IndexerError, Result};
use crate::pipeline::crawl::{CrawlOutcome, Crawler};
use crate::pipeline::index::{build_search_index, IndexReport};
use crate::pipeline::promote::GenerationManager;
use crate::pipeline::sink::{persist_entries, FileSink};

/// What a finished cycle did.
#[derive(Debug, Clone)]
pub struct CycleSummary {
    pub cycle: &'static str,
    pub names: usize,
    pub entries: usize,
    pub resolution_errors: usize,
    /// Present for store cycles
    pub index: Option<IndexReport>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleSummary {
    fn new(cycle: &'static str, started_at: DateTime<Utc>, outcome: &CrawlOutcome) -> Self {
        Self {
            cycle,
            names: outcome.names.len(),
            entries: outcome.entries.len(),
            resolution_errors: outcome.error_count,
            index: None,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// A unit of work the scheduler can run repeatedly.
#[async_trait]
pub trait Cycle: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Run the pipeline once.
    async fn run(&self) -> Result<CycleSummary>;
}

/// Crawl and write the names/profiles artifacts.
pub struct FileDumpCycle {
    crawler: Crawler,
    sink: FileSink,
}

impl FileDumpCycle {
    pub fn new(crawler: Crawler, sink: FileSink) -> Self {
        Self { crawler, sink }
    }
}

#[async_trait]
impl Cycle for FileDumpCycle {
    fn name(&self) -> &'static str {
        "fetch-to-json"
    }

    async fn run(&self) -> Result<CycleSummary> {
        let started_at = Utc::now();
        self.sink.preflight().await?;

        let outcome = self.crawler.run().await?;
        self.sink.write(&outcome).await?;

        Ok(CycleSummary::new(self.name(), started_at, &outcome))
    }
}

/// Where a store cycle takes its entries from.
pub enum EntrySource {
    /// Crawl the directory
    Crawl(Crawler),
    /// Load a previous `fetch-to-json` dump
    Dump(FileSink),
}

impl EntrySource {
    async fn fetch(&self) -> Result<CrawlOutcome> {
        match self {
            Self::Crawl(crawler) => crawler.run().await,
            Self::Dump(sink) => sink.load().await,
        }
    }
}

/// Build a fresh index generation in the document store and promote it.
pub struct StoreIndexCycle {
    source: EntrySource,
    generations: GenerationManager,
}

impl StoreIndexCycle {
    pub fn new(source: EntrySource, generations: GenerationManager) -> Self {
        Self {
            source,
            generations,
        }
    }
}

#[async_trait]
impl Cycle for StoreIndexCycle {
    fn name(&self) -> &'static str {
        "index"
    }

    async fn run(&self) -> Result<CycleSummary> {
        let started_at = Utc::now();
        let store = Arc::clone(self.generations.store());
        let source = &self.source;

        let (outcome, report) = self
            .generations
            .promote(|dbs| async move {
                let outcome = source.fetch().await?;
                persist_entries(store.as_ref(), &dbs.search_db, &outcome.entries).await?;
                info!("Finished crawling names. Building index.");

                let report =
                    build_search_index(store.as_ref(), &dbs.search_db, &dbs.search_cache).await?;
                Ok::<_, IndexerError>((outcome, report))
            })
            .await?;

        let mut summary = CycleSummary::new(self.name(), started_at, &outcome);
        summary.index = Some(report);
        Ok(summary)
    }
}
