//! Typed errors for the indexer library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Soft failures (a single name
//! failing to resolve, a single entry failing extraction) have their own
//! types and are aggregated by the pipeline instead of being propagated.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::generation::PromotionStep;

/// Errors that end an indexing cycle.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// A directory listing walk failed
    #[error("listing failed: {0}")]
    Listing(#[from] ListingError),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Building the `next` generation failed; `current` was not touched
    #[error("next-generation build failed: {0}")]
    Build(#[source] Box<IndexerError>),

    /// A generation rotation step failed
    #[error("promotion failed at step {step}: {source}")]
    Promotion {
        step: PromotionStep,
        #[source]
        source: Box<IndexerError>,
    },

    /// Rollback requested but the prior generation is missing or partial
    #[error("no prior generation to restore: {database} is empty")]
    NoPriorGeneration { database: String },

    /// Target path exists but cannot be written
    #[error("cannot write to path: {}", path.display())]
    PathNotWritable { path: PathBuf },

    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),
}

impl IndexerError {
    /// Wrap any storage backend error.
    pub fn storage(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage(err.into())
    }

    /// True when the failure may have left no usable `current` generation.
    pub fn threatens_current(&self) -> bool {
        matches!(self, Self::Promotion { step, .. } if step.threatens_current())
    }
}

/// Errors that can occur while walking a paginated listing.
#[derive(Debug, Error)]
pub enum ListingError {
    /// HTTP request failed
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Page body was not a JSON array of names
    #[error("malformed page at {url}: {reason}")]
    Malformed { url: String, reason: String },

    /// Invalid base URL
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors from a single profile lookup. Always soft.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Lookup did not settle before the per-lookup timeout
    #[error("lookup for {name} timed out after {secs}s")]
    Timeout { name: String, secs: u64 },

    /// No profile exists for the name
    #[error("profile not found: {name}")]
    NotFound { name: String },

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Profile document could not be decoded
    #[error("malformed profile for {name}: {reason}")]
    Malformed { name: String, reason: String },
}

/// Errors extracting a search profile from a namespace entry. Always soft.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("entry has no fqu")]
    MissingFqu,

    #[error("profile is missing or not an object")]
    MissingProfile,

    #[error("account field is not an array")]
    AccountNotArray,

    #[error("account entry is not an object")]
    MalformedAccount,

    #[error("name field has unsupported shape")]
    MalformedName,
}

/// Result type alias for indexer operations.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Result type alias for listing operations.
pub type ListingResult<T> = std::result::Result<T, ListingError>;

/// Result type alias for single profile lookups.
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;
