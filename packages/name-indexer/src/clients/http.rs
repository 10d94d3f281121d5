//! HTTP clients for the name directory API.
//!
//! - [`HttpDirectory`] walks `GET {api}/v1/{names|subdomains}?page=N`
//! - [`HttpProfileResolver`] resolves `GET {api}/v1/users/{name}`
//!
//! # Example
//!
//! ```rust,ignore
//! use name_indexer::clients::{HttpDirectory, HttpProfileResolver, HttpTransport};
//!
//! let transport = HttpTransport::new("http://localhost:6270", 75)?;
//! let directory = HttpDirectory::new(transport.clone());
//! let resolver = HttpProfileResolver::new(transport);
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use crate::error::{IndexerError, ListingError, ListingResult, ResolveError, ResolveResult, Result};
use crate::traits::{directory::Directory, resolver::ProfileResolver};
use crate::types::profile::{username_for, ListingKind};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Connect timeout for every request. Whole-lookup timeouts are imposed by
/// the caller.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level key of an API error object.
const ERROR_KEY: &str = "error";

/// A JSON body or a non-success status.
enum Fetched {
    Json(Value),
    Status(u16),
}

/// Shared HTTP client with a global connection ceiling.
///
/// Cloning is cheap; clones share the connection pool and the ceiling.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    permits: Arc<Semaphore>,
}

impl HttpTransport {
    /// Build a transport for `api_url` allowing at most `max_connections`
    /// requests in flight.
    pub fn new(api_url: &str, max_connections: usize) -> Result<Self> {
        let parsed = Url::parse(api_url)
            .map_err(|e| IndexerError::Config(format!("invalid api url {api_url}: {e}")))?;
        let max_connections = max_connections.max(1);

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(max_connections)
            .build()
            .map_err(|e| IndexerError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            permits: Arc::new(Semaphore::new(max_connections)),
        })
    }

    /// Requests that may still start before hitting the ceiling.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, url::ParseError> {
        Url::parse(&format!("{}/v1/{}", self.base_url, path))
    }

    async fn get_json(&self, url: &Url) -> std::result::Result<Fetched, BoxError> {
        let _permit = self.permits.acquire().await?;

        debug!(url = %url, "HTTP fetch starting");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Ok(Fetched::Status(status.as_u16()));
        }

        Ok(Fetched::Json(response.json().await?))
    }
}

/// Directory client over the listing endpoints.
pub struct HttpDirectory {
    transport: HttpTransport,
}

impl HttpDirectory {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn fetch_page(&self, kind: ListingKind, page: u64) -> ListingResult<Vec<String>> {
        let mut url = self.transport.endpoint(kind.path())?;
        url.query_pairs_mut().append_pair("page", &page.to_string());

        let body = match self.transport.get_json(&url).await {
            Ok(Fetched::Json(body)) => body,
            Ok(Fetched::Status(status)) => {
                return Err(ListingError::Status {
                    url: url.to_string(),
                    status,
                })
            }
            Err(source) => {
                warn!(url = %url, error = %source, "listing request failed");
                return Err(ListingError::Http {
                    url: url.to_string(),
                    source,
                });
            }
        };

        parse_listing_page(url.as_str(), body)
    }
}

/// A page must be a JSON array of strings.
fn parse_listing_page(url: &str, body: Value) -> ListingResult<Vec<String>> {
    let items = match body {
        Value::Array(items) => items,
        other => {
            return Err(ListingError::Malformed {
                url: url.to_string(),
                reason: format!("expected array, got {}", json_kind(&other)),
            })
        }
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(name),
            other => Err(ListingError::Malformed {
                url: url.to_string(),
                reason: format!("expected string entry, got {}", json_kind(&other)),
            }),
        })
        .collect()
}

/// Profile resolver over the users endpoint.
pub struct HttpProfileResolver {
    transport: HttpTransport,
}

impl HttpProfileResolver {
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ProfileResolver for HttpProfileResolver {
    async fn resolve(&self, name: &str) -> ResolveResult<Value> {
        let url = self
            .transport
            .endpoint(&format!("users/{name}"))
            .map_err(|e| ResolveError::Malformed {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        match self.transport.get_json(&url).await {
            Ok(Fetched::Json(body)) => extract_profile(name, body),
            Ok(Fetched::Status(404)) => Err(ResolveError::NotFound {
                name: name.to_string(),
            }),
            Ok(Fetched::Status(status)) => Err(ResolveError::Http(
                format!("HTTP {status} resolving {name}").into(),
            )),
            Err(e) => Err(ResolveError::Http(e)),
        }
    }
}

/// Pull the profile out of a users response.
///
/// Accepts `{ "<name>": { "profile": {...} } }`, keyed by the full or the
/// stripped name, or a bare profile object. An unkeyed body carrying an
/// `error` key is an API error, not a profile.
fn extract_profile(name: &str, body: Value) -> ResolveResult<Value> {
    let mut body = match body {
        Value::Object(map) => map,
        other => {
            return Err(ResolveError::Malformed {
                name: name.to_string(),
                reason: format!("expected object, got {}", json_kind(&other)),
            })
        }
    };

    let keyed = body
        .remove(name)
        .or_else(|| body.remove(username_for(name)));

    match keyed {
        Some(Value::Object(mut wrapper)) => match wrapper.remove("profile") {
            Some(profile @ Value::Object(_)) => Ok(profile),
            _ => Err(ResolveError::Malformed {
                name: name.to_string(),
                reason: "entry has no profile object".to_string(),
            }),
        },
        Some(other) => Err(ResolveError::Malformed {
            name: name.to_string(),
            reason: format!("entry is {}", json_kind(&other)),
        }),
        None if body.contains_key(ERROR_KEY) => Err(ResolveError::Malformed {
            name: name.to_string(),
            reason: format!("API error: {}", body[ERROR_KEY]),
        }),
        None => Ok(Value::Object(body)),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local API that holds every request for `delay` and records the peak
    /// number of requests it is holding at once.
    async fn spawn_slow_api(delay: Duration) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let api_url = format!("http://{}", listener.local_addr().unwrap());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let observed = peak.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let active = active.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }

                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    // released before replying so a client-side permit always outlives it
                    active.fetch_sub(1, Ordering::SeqCst);

                    let body = if request.starts_with(b"GET /v1/users/") {
                        r#"{"name":"x"}"#
                    } else {
                        "[]"
                    };
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (api_url, observed)
    }

    #[test]
    fn test_listing_page_parses_names() {
        let names = parse_listing_page("u", json!(["a.id", "b.id"])).unwrap();
        assert_eq!(names, vec!["a.id", "b.id"]);
        assert!(parse_listing_page("u", json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_listing_page_rejects_other_shapes() {
        assert!(matches!(
            parse_listing_page("u", json!({"names": []})),
            Err(ListingError::Malformed { .. })
        ));
        assert!(matches!(
            parse_listing_page("u", json!(["a.id", 3])),
            Err(ListingError::Malformed { .. })
        ));
    }

    #[test]
    fn test_profile_keyed_by_full_or_stripped_name() {
        let full = json!({"alice.id": {"profile": {"name": "Alice"}}});
        let stripped = json!({"alice": {"profile": {"name": "Alice"}}});

        assert_eq!(extract_profile("alice.id", full).unwrap(), json!({"name": "Alice"}));
        assert_eq!(
            extract_profile("alice.id", stripped).unwrap(),
            json!({"name": "Alice"})
        );
    }

    #[test]
    fn test_bare_profile_is_accepted() {
        let body = json!({"name": "Bob", "account": []});
        assert_eq!(extract_profile("bob.id", body.clone()).unwrap(), body);
    }

    #[test]
    fn test_keyed_entry_without_profile_is_malformed() {
        let body = json!({"bob.id": {"zone_file": "..."}});
        assert!(matches!(
            extract_profile("bob.id", body),
            Err(ResolveError::Malformed { .. })
        ));
        assert!(matches!(
            extract_profile("bob.id", json!("nope")),
            Err(ResolveError::Malformed { .. })
        ));
    }

    #[test]
    fn test_error_body_is_not_a_profile() {
        let body = json!({"error": "Name not registered"});
        let err = extract_profile("ghost.id", body).unwrap_err();

        assert!(matches!(err, ResolveError::Malformed { .. }));
        assert!(err.to_string().contains("Name not registered"));
    }

    #[tokio::test]
    async fn test_ceiling_shared_by_directory_and_resolver() {
        let (api_url, peak) = spawn_slow_api(Duration::from_millis(50)).await;
        let transport = HttpTransport::new(&api_url, 3).unwrap();
        let directory = HttpDirectory::new(transport.clone());
        let resolver = HttpProfileResolver::new(transport.clone());

        let names: Vec<String> = (0..10).map(|i| format!("user{i}.id")).collect();
        let lookups = join_all(names.iter().map(|name| resolver.resolve(name)));
        let pages = join_all((0..5).map(|page| directory.fetch_page(ListingKind::Names, page)));
        let (profiles, pages) = tokio::join!(lookups, pages);

        assert!(profiles.iter().all(|r| r.is_ok()), "{profiles:?}");
        assert!(pages.iter().all(|r| r.is_ok()), "{pages:?}");

        let peak = peak.load(Ordering::SeqCst);
        assert!((1..=3).contains(&peak), "server held {peak} requests at once");
        assert_eq!(transport.available_permits(), 3);
    }

    #[test]
    fn test_transport_joins_endpoints() {
        let transport = HttpTransport::new("http://localhost:6270/", 4).unwrap();
        assert_eq!(
            transport.endpoint("names").unwrap().as_str(),
            "http://localhost:6270/v1/names"
        );
        assert_eq!(transport.available_permits(), 4);
        assert!(HttpTransport::new("not a url", 4).is_err());
    }
}
