//! Key-value cache trait.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::GraphMindResult;

/// Best-effort cache. Callers treat both misses and errors as "not cached".
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fetch a value, `None` on miss or expiry.
    async fn get(&self, key: &str) -> GraphMindResult<Option<String>>;

    /// Store a value for `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> GraphMindResult<()>;
}
