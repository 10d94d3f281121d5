//! Configuration types for crawling and resolution.

use std::time::Duration;

/// Default number of names resolved concurrently per batch.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default per-lookup timeout.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a crawl cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlConfig {
    /// Stop each listing walk before this page index. `None` = unbounded.
    pub page_limit: Option<u64>,

    /// Names resolved concurrently per batch.
    ///
    /// Batches run strictly one after another. Default: 50.
    pub batch_size: usize,

    /// How long a single profile lookup may take. Default: 30s.
    pub lookup_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            page_limit: None,
            batch_size: DEFAULT_BATCH_SIZE,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }
}

impl CrawlConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page limit. Values `<= 0` mean unbounded.
    pub fn with_page_limit(mut self, pages: i64) -> Self {
        self.page_limit = page_limit_from(pages);
        self
    }

    /// Set the batch size (clamped to at least one).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the per-lookup timeout.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }
}

/// Map a signed page count to a limit; non-positive means unbounded.
pub fn page_limit_from(pages: i64) -> Option<u64> {
    u64::try_from(pages).ok().filter(|p| *p > 0)
}
