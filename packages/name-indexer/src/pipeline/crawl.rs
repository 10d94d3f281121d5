//! Crawl orchestration: list → resolve → normalize → derive entries.

use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::pipeline::paginate::fetch_all;
use crate::pipeline::resolve::resolve_all;
use crate::traits::{directory::Directory, resolver::ProfileResolver};
use crate::types::config::CrawlConfig;
use crate::types::profile::{ListingKind, NamespaceEntry};

/// Result of one crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlOutcome {
    /// Every listed name: domains first, then subdomains
    pub names: Vec<String>,

    /// One entry per successfully resolved name
    pub entries: Vec<NamespaceEntry>,

    /// Lookups that timed out or failed
    pub error_count: usize,
}

/// Sequences both listing walks and profile resolution.
pub struct Crawler {
    directory: Arc<dyn Directory>,
    resolver: Arc<dyn ProfileResolver>,
    config: CrawlConfig,
}

impl Crawler {
    pub fn new(
        directory: Arc<dyn Directory>,
        resolver: Arc<dyn ProfileResolver>,
        config: CrawlConfig,
    ) -> Self {
        Self {
            directory,
            resolver,
            config,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Run one crawl. Fails if either listing walk fails.
    pub async fn run(&self) -> Result<CrawlOutcome> {
        let page_limit = self.config.page_limit;
        let (domains, subdomains) = tokio::try_join!(
            fetch_all(self.directory.as_ref(), ListingKind::Names, page_limit),
            fetch_all(self.directory.as_ref(), ListingKind::Subdomains, page_limit),
        )?;

        info!(
            domains = domains.len(),
            subdomains = subdomains.len(),
            "Fetching {} entries",
            domains.len() + subdomains.len()
        );

        let mut names = domains;
        names.extend(subdomains);

        let resolved = resolve_all(
            self.resolver.as_ref(),
            &names,
            self.config.batch_size,
            self.config.lookup_timeout,
        )
        .await;

        let entries = resolved
            .records
            .into_iter()
            .map(NamespaceEntry::from_record)
            .collect();

        info!("Finished batching. Writing...");

        Ok(CrawlOutcome {
            names,
            entries,
            error_count: resolved.error_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IndexerError;
    use crate::testing::{MockDirectory, MockResolver};
    use serde_json::json;

    fn crawler(directory: MockDirectory, resolver: MockResolver) -> Crawler {
        Crawler::new(Arc::new(directory), Arc::new(resolver), CrawlConfig::default())
    }

    #[tokio::test]
    async fn test_two_pages_become_namespace_entries() {
        let directory = MockDirectory::new().with_names_pages(vec![
            vec!["a.id".into()],
            vec!["b.id".into()],
            vec![],
        ]);
        let resolver = MockResolver::new()
            .with_profile("a.id", json!({"name": "A"}))
            .with_profile("b.id", json!({"name": "B"}));

        let outcome = crawler(directory, resolver).run().await.unwrap();

        assert_eq!(outcome.names, vec!["a.id", "b.id"]);
        assert_eq!(outcome.error_count, 0);
        let summary: Vec<(&str, &str)> = outcome
            .entries
            .iter()
            .map(|e| (e.username.as_str(), e.fqu.as_str()))
            .collect();
        assert_eq!(summary, vec![("a", "a.id"), ("b", "b.id")]);
    }

    #[tokio::test]
    async fn test_subdomains_are_merged_after_domains() {
        let directory = MockDirectory::new()
            .with_names_pages(vec![vec!["alice.id".into()], vec![]])
            .with_subdomain_pages(vec![vec!["bob.alice.id".into()], vec![]]);

        let outcome = crawler(directory, MockResolver::new()).run().await.unwrap();

        assert_eq!(outcome.names, vec!["alice.id", "bob.alice.id"]);
        assert_eq!(outcome.entries[1].username, "bob.alice");
    }

    #[tokio::test]
    async fn test_resolution_errors_are_counted() {
        let directory =
            MockDirectory::new().with_names_pages(vec![vec!["a.id".into(), "b.id".into()], vec![]]);
        let resolver = MockResolver::new().with_failure("b.id");

        let outcome = crawler(directory, resolver).run().await.unwrap();

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.error_count, 1);
    }

    #[tokio::test]
    async fn test_listing_failure_fails_run() {
        let directory = MockDirectory::new()
            .with_names_pages(vec![vec!["a.id".into()], vec![]])
            .failing_at(ListingKind::Subdomains, 0);
        let resolver = MockResolver::new();

        let result = crawler(directory, resolver).run().await;

        assert!(matches!(result, Err(IndexerError::Listing(_))));
    }
}
