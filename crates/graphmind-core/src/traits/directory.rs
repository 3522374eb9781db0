//! Entity directory trait: the per-user system of record for canonical entities.

use async_trait::async_trait;

use crate::error::GraphMindResult;
use crate::types::CanonicalEntity;

/// Per-user store of canonical entities.
///
/// Implementations are assumed safe for concurrent use. Concurrent upserts of
/// the same key are last-write-wins.
#[async_trait]
pub trait EntityDirectory: Send + Sync {
    /// Entities whose canonical name or an alias contains `name_like`
    /// (case-insensitive).
    async fn search(
        &self,
        user_id: &str,
        name_like: &str,
        limit: usize,
    ) -> GraphMindResult<Vec<CanonicalEntity>>;

    /// Most recently updated entities first, optionally restricted to a type.
    async fn list(
        &self,
        user_id: &str,
        entity_type: Option<&str>,
        limit: usize,
    ) -> GraphMindResult<Vec<CanonicalEntity>>;

    /// Fetch one entity by key.
    async fn get(&self, user_id: &str, entity_key: &str) -> GraphMindResult<Option<CanonicalEntity>>;

    /// Insert or replace the record for `(entity.user_id, entity.entity_key)`.
    async fn upsert(&self, entity: &CanonicalEntity) -> GraphMindResult<()>;

    /// Delete a record. Returns whether anything was removed.
    async fn delete(&self, user_id: &str, entity_key: &str) -> GraphMindResult<bool>;
}
