//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the indexer library
//! without a live directory service or resolver.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{IndexerError, ListingError, ListingResult, ResolveError, ResolveResult, Result};
use crate::traits::{directory::Directory, resolver::ProfileResolver, store::DocumentStore};
use crate::types::profile::ListingKind;

/// A mock directory service serving predefined listing pages.
///
/// Pages past the configured ones are empty, so every walk terminates.
/// Clones share their pages and request log.
#[derive(Clone, Default)]
pub struct MockDirectory {
    /// Predefined pages per listing
    pages: Arc<RwLock<HashMap<ListingKind, Vec<Vec<String>>>>>,

    /// `(listing, page)` pairs that answer with HTTP 500
    failures: Arc<RwLock<HashSet<(ListingKind, u64)>>>,

    /// Call tracking for assertions
    requests: Arc<RwLock<Vec<(ListingKind, u64)>>>,
}

impl MockDirectory {
    /// Create a directory with empty listings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pages of a listing.
    pub fn with_pages(self, kind: ListingKind, pages: Vec<Vec<String>>) -> Self {
        self.pages.write().unwrap().insert(kind, pages);
        self
    }

    /// Set the pages of the top-level names listing.
    pub fn with_names_pages(self, pages: Vec<Vec<String>>) -> Self {
        self.with_pages(ListingKind::Names, pages)
    }

    /// Set the pages of the subdomains listing.
    pub fn with_subdomain_pages(self, pages: Vec<Vec<String>>) -> Self {
        self.with_pages(ListingKind::Subdomains, pages)
    }

    /// Make one page fail.
    pub fn failing_at(self, kind: ListingKind, page: u64) -> Self {
        self.failures.write().unwrap().insert((kind, page));
        self
    }

    /// Pages requested from a listing, in request order.
    pub fn requested(&self, kind: ListingKind) -> Vec<u64> {
        self.requests
            .read()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, page)| *page)
            .collect()
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn fetch_page(&self, kind: ListingKind, page: u64) -> ListingResult<Vec<String>> {
        self.requests.write().unwrap().push((kind, page));

        if self.failures.read().unwrap().contains(&(kind, page)) {
            return Err(ListingError::Status {
                url: format!("mock://{}?page={}", kind.path(), page),
                status: 500,
            });
        }

        let page = self
            .pages
            .read()
            .unwrap()
            .get(&kind)
            .and_then(|pages| pages.get(page as usize).cloned())
            .unwrap_or_default();
        Ok(page)
    }
}

/// How the mock resolver answers one name.
#[derive(Debug, Clone)]
enum Behavior {
    Profile(Value),
    Fail,
    Hang,
}

/// A mock profile resolver with per-name behavior and concurrency tracking.
///
/// Names without configured behavior resolve to an empty profile.
#[derive(Default)]
pub struct MockResolver {
    behaviors: RwLock<HashMap<String, Behavior>>,

    /// Delay applied to every lookup
    delay: Option<Duration>,

    /// Per-name delays, overriding `delay`
    named_delays: RwLock<HashMap<String, Duration>>,

    in_flight: Arc<AtomicUsize>,
    max_in_flight: AtomicUsize,

    /// Lookups started per wave of overlapping work
    waves: RwLock<Vec<usize>>,

    calls: RwLock<Vec<String>>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay one name's lookup.
    pub fn with_named_delay(self, name: impl Into<String>, delay: Duration) -> Self {
        self.named_delays.write().unwrap().insert(name.into(), delay);
        self
    }

    /// Answer a name with a profile.
    pub fn with_profile(self, name: impl Into<String>, profile: Value) -> Self {
        self.behaviors
            .write()
            .unwrap()
            .insert(name.into(), Behavior::Profile(profile));
        self
    }

    /// Fail a name's lookup.
    pub fn with_failure(self, name: impl Into<String>) -> Self {
        self.behaviors.write().unwrap().insert(name.into(), Behavior::Fail);
        self
    }

    /// Never settle a name's lookup.
    pub fn with_hang(self, name: impl Into<String>) -> Self {
        self.behaviors.write().unwrap().insert(name.into(), Behavior::Hang);
        self
    }

    /// Highest number of lookups observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Lookups started in each wave. A wave begins when a lookup starts
    /// with nothing else in flight.
    pub fn batch_widths(&self) -> Vec<usize> {
        self.waves.read().unwrap().clone()
    }

    /// Every name looked up, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    fn enter(&self) -> InFlight {
        let previous = self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.max_in_flight.fetch_max(previous + 1, Ordering::SeqCst);

        let mut waves = self.waves.write().unwrap();
        match waves.last_mut() {
            Some(width) if previous > 0 => *width += 1,
            _ => waves.push(1),
        }

        InFlight(Arc::clone(&self.in_flight))
    }
}

/// Decrements the in-flight counter when a lookup settles or is dropped.
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileResolver for MockResolver {
    async fn resolve(&self, name: &str) -> ResolveResult<Value> {
        self.calls.write().unwrap().push(name.to_string());
        let _guard = self.enter();

        let delay = self
            .named_delays
            .read()
            .unwrap()
            .get(name)
            .copied()
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self.behaviors.read().unwrap().get(name).cloned();
        match behavior {
            Some(Behavior::Profile(profile)) => Ok(profile),
            Some(Behavior::Fail) => Err(ResolveError::NotFound {
                name: name.to_string(),
            }),
            Some(Behavior::Hang) => std::future::pending().await,
            None => Ok(json!({})),
        }
    }
}

/// A store operation [`FlakyStore`] should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailingOp {
    /// `copy_database` into the named database
    CopyTo(String),
    /// `drop_database` of the named database
    Drop(String),
}

/// Wraps a store and fails selected drop/copy operations.
pub struct FlakyStore {
    inner: Arc<dyn DocumentStore>,
    failing: Vec<FailingOp>,
}

impl FlakyStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner,
            failing: Vec::new(),
        }
    }

    /// Add an operation that should fail.
    pub fn failing(mut self, op: FailingOp) -> Self {
        self.failing.push(op);
        self
    }

    fn check(&self, op: FailingOp) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(IndexerError::storage(format!("injected failure: {op:?}")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn upsert(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        doc: &Value,
    ) -> Result<()> {
        self.inner.upsert(database, collection, key, doc).await
    }

    async fn get(&self, database: &str, collection: &str, key: &str) -> Result<Option<Value>> {
        self.inner.get(database, collection, key).await
    }

    async fn scan(&self, database: &str, collection: &str) -> Result<Vec<(String, Value)>> {
        self.inner.scan(database, collection).await
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        self.inner.database_exists(database).await
    }

    async fn drop_database(&self, database: &str) -> Result<()> {
        self.check(FailingOp::Drop(database.to_string()))?;
        self.inner.drop_database(database).await
    }

    async fn copy_database(&self, from: &str, to: &str) -> Result<()> {
        self.check(FailingOp::CopyTo(to.to_string()))?;
        self.inner.copy_database(from, to).await
    }
}
