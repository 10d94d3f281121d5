//! Name Directory Search Indexer
//!
//! Crawls a paginated name directory, resolves every listed name to its
//! profile document and publishes the results either as JSON artifacts or
//! as a generational search index in a document store.
//!
//! # Flow
//!
//! ```text
//! Scheduler → Cycle → Crawler → [fetch_all, resolve_all] → normalize
//!           → FileSink | persist_entries → build_search_index
//!           → GenerationManager::promote
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use name_indexer::{
//!     Crawler, CrawlConfig, EntrySource, GenerationManager, HttpDirectory,
//!     HttpProfileResolver, HttpTransport, MemoryStore, StoreIndexCycle, Scheduler,
//! };
//!
//! let transport = HttpTransport::new("http://localhost:6270", 75)?;
//! let crawler = Crawler::new(
//!     Arc::new(HttpDirectory::new(transport.clone())),
//!     Arc::new(HttpProfileResolver::new(transport)),
//!     CrawlConfig::default(),
//! );
//! let cycle = StoreIndexCycle::new(
//!     EntrySource::Crawl(crawler),
//!     GenerationManager::new(Arc::new(MemoryStore::new())),
//! );
//! let summary = Scheduler::new(Arc::new(cycle), interval).run_once().await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams to the outside world (Directory, ProfileResolver, DocumentStore)
//! - [`types`] - Records, entries, generations and crawl configuration
//! - [`pipeline`] - Crawl, index and promotion stages plus the cycles tying them together
//! - [`clients`] - HTTP directory and resolver clients
//! - [`stores`] - Document store implementations (MemoryStore, SqliteStore)
//! - [`scheduler`] - Interval runner with skip-while-running semantics
//! - [`testing`] - Mock implementations for testing

pub mod clients;
pub mod error;
pub mod pipeline;
pub mod scheduler;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractError, IndexerError, ListingError, ResolveError, Result};
pub use traits::{
    directory::Directory,
    resolver::ProfileResolver,
    store::{DocumentStore, DocumentStoreExt},
};
pub use types::{
    config::CrawlConfig,
    generation::{Generation, GenerationDatabases, Partition, PromotionStep},
    profile::{
        CacheKind, ListingKind, NamespaceEntry, ProfileRecord, RawProfileEntry, SearchProfileEntry,
    },
};

// Re-export pipeline components
pub use pipeline::{
    // Stages
    build_search_index, fetch_all, normalize_document, persist_entries, resolve_all,
    // Orchestration
    CrawlOutcome, Crawler, GenerationManager, IndexReport, ResolveOutcome,
    // Cycles
    Cycle, CycleSummary, EntrySource, FileDumpCycle, FileSink, StoreIndexCycle,
};

// Re-export clients
pub use clients::{HttpDirectory, HttpProfileResolver, HttpTransport};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "sqlite")]
pub use stores::SqliteStore;

pub use scheduler::{Scheduler, SchedulerState, TickOutcome};

// Re-export testing utilities
pub use testing::{FailingOp, FlakyStore, MockDirectory, MockResolver};
