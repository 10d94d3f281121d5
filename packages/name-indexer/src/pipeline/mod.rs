//! Indexing pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Listing walks over the paginated directory
//! - Bounded, timed profile resolution
//! - Key normalization of resolved documents
//! - Persistence to JSON artifacts or a document store
//! - Search index and cache derivation
//! - Generation rotation (next → current → prior)

pub mod crawl;
pub mod cycle;
pub mod index;
pub mod normalize;
pub mod paginate;
pub mod promote;
pub mod resolve;
pub mod sink;

pub use crawl::{CrawlOutcome, Crawler};
pub use cycle::{Cycle, CycleSummary, EntrySource, FileDumpCycle, StoreIndexCycle};
pub use index::{build_search_index, extract_search_profile, IndexReport};
pub use normalize::{normalize_document, normalize_key};
pub use paginate::fetch_all;
pub use promote::GenerationManager;
pub use resolve::{resolve_all, resolve_one, ResolveOutcome};
pub use sink::{ensure_writable, persist_entries, FileSink};
