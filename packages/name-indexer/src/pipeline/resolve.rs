//! Bounded profile resolution.
//!
//! Names are resolved in fixed-size batches. Batches run strictly one after
//! another, so at most one batch of lookups is ever in flight; lookups inside
//! a batch run concurrently. Each lookup races a timer and a lookup that
//! loses the race is dropped, never retried.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info};

use crate::error::{ResolveError, ResolveResult};
use crate::pipeline::normalize::normalize_document;
use crate::traits::resolver::ProfileResolver;
use crate::types::profile::ProfileRecord;

/// Log progress every this many batches.
const PROGRESS_EVERY_BATCHES: usize = 10;

/// Result of resolving a set of names.
#[derive(Debug, Clone, Default)]
pub struct ResolveOutcome {
    /// Successfully resolved, normalized records
    pub records: Vec<ProfileRecord>,

    /// Lookups that timed out or failed
    pub error_count: usize,

    /// Number of batches issued
    pub batches: usize,
}

/// Resolve every name with bounded concurrency.
///
/// Soft failures are counted and excluded; this function itself never fails.
pub async fn resolve_all<R>(
    resolver: &R,
    names: &[String],
    batch_size: usize,
    lookup_timeout: Duration,
) -> ResolveOutcome
where
    R: ProfileResolver + ?Sized,
{
    let mut outcome = ResolveOutcome::default();
    let batch_size = batch_size.max(1);

    for (batch_ix, batch) in names.chunks(batch_size).enumerate() {
        if batch_ix % PROGRESS_EVERY_BATCHES == 0 {
            info!("Fetched {} batches of {}", batch_ix, batch_size);
        }

        let lookups = batch
            .iter()
            .map(|name| resolve_one(resolver, name, lookup_timeout));
        let results = join_all(lookups).await;

        for (name, result) in batch.iter().zip(results) {
            match result {
                Ok(profile) => outcome
                    .records
                    .push(ProfileRecord::new(name.clone(), normalize_document(profile))),
                Err(e) => {
                    debug!(name = %name, error = %e, "Failed looking up profile");
                    outcome.error_count += 1;
                }
            }
        }

        outcome.batches += 1;
    }

    info!(
        resolved = outcome.records.len(),
        errors = outcome.error_count,
        batches = outcome.batches,
        "Total errored lookups: {}",
        outcome.error_count
    );

    outcome
}

/// Resolve one name, giving up after `lookup_timeout`.
pub async fn resolve_one<R>(
    resolver: &R,
    name: &str,
    lookup_timeout: Duration,
) -> ResolveResult<serde_json::Value>
where
    R: ProfileResolver + ?Sized,
{
    match tokio::time::timeout(lookup_timeout, resolver.resolve(name)).await {
        Ok(result) => result,
        Err(_) => Err(ResolveError::Timeout {
            name: name.to_string(),
            secs: lookup_timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockResolver;
    use serde_json::json;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("user{i}.id")).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_sequential_and_bounded() {
        let resolver = MockResolver::new().with_delay(Duration::from_millis(100));
        let input = names(120);

        let outcome = resolve_all(&resolver, &input, 50, Duration::from_secs(30)).await;

        assert_eq!(outcome.batches, 3);
        assert_eq!(outcome.records.len(), 120);
        assert_eq!(outcome.error_count, 0);
        assert_eq!(resolver.max_in_flight(), 50);
        assert_eq!(resolver.batch_widths(), vec![50, 50, 20]);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_full_last_batch() {
        let resolver = MockResolver::new();
        let outcome = resolve_all(&resolver, &names(100), 50, Duration::from_secs(30)).await;
        assert_eq!(outcome.batches, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_lookup_times_out_once() {
        let resolver = MockResolver::new().with_hang("slow.id");
        let input = vec!["fast.id".to_string(), "slow.id".to_string()];

        let outcome = resolve_all(&resolver, &input, 50, Duration::from_secs(30)).await;

        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].fqu, "fast.id");
        assert!(outcome.records.iter().all(|r| r.fqu != "slow.id"));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let resolver = MockResolver::new()
            .with_failure("bad.id")
            .with_profile("good.id", json!({"name": "Good"}));
        let input = vec!["bad.id".to_string(), "good.id".to_string()];

        let outcome = resolve_all(&resolver, &input, 1, Duration::from_secs(30)).await;

        assert_eq!(outcome.batches, 2);
        assert_eq!(outcome.error_count, 1);
        assert_eq!(outcome.records, vec![ProfileRecord::new("good.id", json!({"name": "Good"}))]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keyed_by_name_not_arrival() {
        // first name finishes last
        let resolver = MockResolver::new()
            .with_profile("a.id", json!({"n": "a"}))
            .with_profile("b.id", json!({"n": "b"}))
            .with_named_delay("a.id", Duration::from_secs(5));
        let input = vec!["a.id".to_string(), "b.id".to_string()];

        let outcome = resolve_all(&resolver, &input, 2, Duration::from_secs(30)).await;

        assert_eq!(outcome.records[0], ProfileRecord::new("a.id", json!({"n": "a"})));
        assert_eq!(outcome.records[1], ProfileRecord::new("b.id", json!({"n": "b"})));
    }

    #[tokio::test]
    async fn test_profiles_are_normalized() {
        let resolver =
            MockResolver::new().with_profile("a.id", json!({"account.type": "x", "$oid": "1"}));
        let input = vec!["a.id".to_string()];

        let outcome = resolve_all(&resolver, &input, 50, Duration::from_secs(30)).await;

        assert_eq!(outcome.records[0].profile, json!({"account_type": "x", "_oid": "1"}));
    }
}
