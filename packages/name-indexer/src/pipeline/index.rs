//! Search index builder.
//!
//! Scans the namespace collection once and derives:
//! - one [`SearchProfileEntry`] per entry, upserted into `profiles`
//! - three singleton cache sets (display names, twitter handles, usernames)
//!
//! Cache values are deduplicated and sorted, so rebuilding from an
//! unchanged namespace collection yields identical cache documents
//! whatever the scan order.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::traits::store::{DocumentStore, DocumentStoreExt};
use crate::types::generation::collections;
use crate::types::profile::{username_for, CacheKind, SearchProfileEntry};

const TWITTER_SERVICE: &str = "twitter";
const OPENBAZAAR_SERVICE: &str = "openbazaar";

/// Summary of one index build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Search profiles upserted
    pub profiles_written: usize,

    /// Namespace keys skipped because their shape was malformed
    pub skipped: Vec<String>,

    /// Unique display names
    pub people: BTreeSet<String>,

    /// Unique twitter handles
    pub twitter_handles: BTreeSet<String>,

    /// Unique usernames
    pub usernames: BTreeSet<String>,
}

impl IndexReport {
    fn values(&self, kind: CacheKind) -> &BTreeSet<String> {
        match kind {
            CacheKind::People => &self.people,
            CacheKind::Twitter => &self.twitter_handles,
            CacheKind::Username => &self.usernames,
        }
    }
}

/// Build the search profiles and cache sets from `search_db`'s namespace.
///
/// Malformed entries are skipped and reported, never fatal. Only storage
/// errors fail the build.
pub async fn build_search_index<S>(store: &S, search_db: &str, cache_db: &str) -> Result<IndexReport>
where
    S: DocumentStore + ?Sized,
{
    let mut report = IndexReport::default();

    for (key, doc) in store.scan(search_db, collections::NAMESPACE).await? {
        let entry = match extract_search_profile(&doc) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key = %key, error = %e, "skipping malformed namespace entry");
                report.skipped.push(key);
                continue;
            }
        };

        if let Some(name) = &entry.name {
            report.people.insert(name.clone());
        }
        if let Some(handle) = &entry.social_handle {
            report.twitter_handles.insert(handle.clone());
        }
        report.usernames.insert(entry.fully_qualified_name.clone());

        store
            .upsert_as(
                search_db,
                collections::PROFILES,
                &entry.fully_qualified_name,
                &entry,
            )
            .await?;
        report.profiles_written += 1;
    }

    if !report.skipped.is_empty() {
        warn!("Errors on names: {:?}", report.skipped);
    }

    for kind in CacheKind::ALL {
        let doc = kind.document(report.values(kind));
        store
            .upsert(cache_db, kind.collection(), kind.field(), &doc)
            .await?;
    }

    info!(
        profiles = report.profiles_written,
        skipped = report.skipped.len(),
        people = report.people.len(),
        twitter_handles = report.twitter_handles.len(),
        usernames = report.usernames.len(),
        "Finished Indexing!"
    );

    Ok(report)
}

/// Derive a search profile from a stored namespace document.
pub fn extract_search_profile(doc: &Value) -> std::result::Result<SearchProfileEntry, ExtractError> {
    let fqu = doc
        .get("fqu")
        .and_then(Value::as_str)
        .ok_or(ExtractError::MissingFqu)?;
    let profile = doc
        .get("profile")
        .filter(|p| p.is_object())
        .ok_or(ExtractError::MissingProfile)?;
    let username = doc
        .get("username")
        .and_then(Value::as_str)
        .unwrap_or(username_for(fqu));

    let mut openbazaar = None;
    let mut twitter = None;
    match profile.get("account") {
        None | Some(Value::Null) => {}
        Some(Value::Array(accounts)) => {
            for account in accounts {
                let account = account.as_object().ok_or(ExtractError::MalformedAccount)?;
                let identifier = account
                    .get("identifier")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                match account.get("service").and_then(Value::as_str) {
                    Some(OPENBAZAAR_SERVICE) => openbazaar = identifier,
                    Some(TWITTER_SERVICE) => twitter = identifier,
                    _ => {}
                }
            }
        }
        Some(_) => return Err(ExtractError::AccountNotArray),
    }

    Ok(SearchProfileEntry {
        name: display_name(profile.get("name"))?,
        profile: profile.clone(),
        openbazaar_identifier: openbazaar,
        social_handle: twitter,
        username: username.to_string(),
        fully_qualified_name: fqu.to_string(),
    })
}

/// Lower-cased display name, preferring a nested `formatted` field.
fn display_name(name: Option<&Value>) -> std::result::Result<Option<String>, ExtractError> {
    match name {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.to_lowercase())),
        Some(Value::Object(obj)) => match obj.get("formatted") {
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(s.to_lowercase())),
            _ => Err(ExtractError::MalformedName),
        },
        Some(_) => Err(ExtractError::MalformedName),
    }
}
