//! Profile types - resolved records, namespace entries and search entries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Suffix stripped from a fully qualified name to derive its username.
pub const NAMESPACE_SUFFIX: &str = ".id";

/// Which paginated listing to walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    /// Top-level registered names
    Names,
    /// Subdomains registered under names
    Subdomains,
}

impl ListingKind {
    /// Path segment of the listing endpoint.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Names => "names",
            Self::Subdomains => "subdomains",
        }
    }

    /// Human label used in progress logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Names => "domain",
            Self::Subdomains => "subdomain",
        }
    }
}

/// A resolved profile for one name.
///
/// This is also the element shape of the profiles file artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Fully qualified name the profile belongs to
    pub fqu: String,

    /// Normalized profile document
    pub profile: Value,
}

impl ProfileRecord {
    pub fn new(fqu: impl Into<String>, profile: Value) -> Self {
        Self {
            fqu: fqu.into(),
            profile,
        }
    }
}

/// Canonical stored unit scanned by the index builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespaceEntry {
    /// Name with a trailing `.id` stripped
    pub username: String,

    /// Fully qualified name
    pub fqu: String,

    /// Normalized profile document
    pub profile: Value,
}

impl NamespaceEntry {
    /// Derive a namespace entry from a resolved record.
    pub fn from_record(record: ProfileRecord) -> Self {
        Self {
            username: username_for(&record.fqu).to_string(),
            fqu: record.fqu,
            profile: record.profile,
        }
    }

    /// The raw record this entry was derived from.
    pub fn to_record(&self) -> ProfileRecord {
        ProfileRecord::new(self.fqu.clone(), self.profile.clone())
    }
}

/// Strip a trailing `.id` from a fully qualified name.
pub fn username_for(fqu: &str) -> &str {
    fqu.strip_suffix(NAMESPACE_SUFFIX).unwrap_or(fqu)
}

/// Raw profile document as stored in the `profile_data` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProfileEntry {
    pub key: String,
    pub value: Value,
}

/// Denormalized record written to the `profiles` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchProfileEntry {
    /// Lower-cased display name
    pub name: Option<String>,

    /// Full profile document
    pub profile: Value,

    /// Identifier of the "openbazaar" account, if any
    #[serde(rename = "openbazaar")]
    pub openbazaar_identifier: Option<String>,

    /// Identifier of the "twitter" account, if any
    #[serde(rename = "twitter_handle")]
    pub social_handle: Option<String>,

    pub username: String,

    #[serde(rename = "fullyQualifiedName")]
    pub fully_qualified_name: String,
}

/// The three singleton cache documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// Unique display names
    People,
    /// Unique twitter handles
    Twitter,
    /// Unique usernames
    Username,
}

impl CacheKind {
    pub const ALL: [CacheKind; 3] = [Self::People, Self::Twitter, Self::Username];

    /// Collection holding this cache in the cache database.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::People => "people_cache",
            Self::Twitter => "twitter_cache",
            Self::Username => "username_cache",
        }
    }

    /// Field name of the value array inside the cache document.
    pub fn field(&self) -> &'static str {
        match self {
            Self::People => "name",
            Self::Twitter => "twitter_handle",
            Self::Username => "username",
        }
    }

    /// Build the cache document for a set of unique values.
    pub fn document<'a>(&self, values: impl IntoIterator<Item = &'a String>) -> Value {
        let values: Vec<Value> = values.into_iter().cloned().map(Value::String).collect();
        let mut doc = serde_json::Map::new();
        doc.insert(self.field().to_string(), Value::Array(values));
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_username_strips_id_suffix() {
        assert_eq!(username_for("alice.id"), "alice");
        assert_eq!(username_for("bob.alice.id"), "bob.alice");
        assert_eq!(username_for("carol.btc"), "carol.btc");
        assert_eq!(username_for("id"), "id");
    }

    #[test]
    fn test_search_entry_wire_names() {
        let entry = SearchProfileEntry {
            name: Some("alice".into()),
            profile: json!({}),
            openbazaar_identifier: None,
            social_handle: Some("alice_tw".into()),
            username: "alice".into(),
            fully_qualified_name: "alice.id".into(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["twitter_handle"], "alice_tw");
        assert_eq!(value["fullyQualifiedName"], "alice.id");
        assert!(value["openbazaar"].is_null());
    }

    #[test]
    fn test_cache_document_shape() {
        let values = vec!["a".to_string(), "b".to_string()];
        let doc = CacheKind::Twitter.document(&values);
        assert_eq!(doc, json!({ "twitter_handle": ["a", "b"] }));
    }
}
