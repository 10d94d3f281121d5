//! Paginated listing walk.

use tracing::{debug, info};

use crate::error::ListingResult;
use crate::traits::directory::Directory;
use crate::types::profile::ListingKind;

/// Log progress every this many pages.
const PROGRESS_EVERY_PAGES: u64 = 20;

/// Walk a listing from page 0 until an empty page or `page_limit`.
///
/// With `page_limit = Some(k)` no page at index `>= k` is requested.
/// Any transport error aborts the walk.
pub async fn fetch_all<D>(
    directory: &D,
    kind: ListingKind,
    page_limit: Option<u64>,
) -> ListingResult<Vec<String>>
where
    D: Directory + ?Sized,
{
    let mut names = Vec::new();
    let mut page = 0u64;

    loop {
        if page_limit.is_some_and(|limit| page >= limit) {
            debug!(kind = kind.label(), page, "page limit reached");
            break;
        }

        if page % PROGRESS_EVERY_PAGES == 0 {
            info!("Fetched {} {} pages...", page, kind.label());
        }

        let batch = directory.fetch_page(kind, page).await?;
        debug!(kind = kind.label(), page, count = batch.len(), "fetched listing page");
        if batch.is_empty() {
            break;
        }

        names.extend(batch);
        page += 1;
    }

    Ok(names)
}
