//! Directory trait for paginated name listings.

use async_trait::async_trait;

use crate::error::ListingResult;
use crate::types::profile::ListingKind;

/// A remote service listing registered names page by page.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Fetch one page of a listing. An empty page marks the end.
    async fn fetch_page(&self, kind: ListingKind, page: u64) -> ListingResult<Vec<String>>;
}
