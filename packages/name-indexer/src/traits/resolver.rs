//! Profile resolution trait.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ResolveResult;

/// Resolves a name to its profile document.
///
/// Implementations may fail or hang; callers impose their own timeout.
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, name: &str) -> ResolveResult<Value>;
}
