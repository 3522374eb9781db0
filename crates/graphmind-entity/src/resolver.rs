//! Reference resolution against the per-user entity directory.
//!
//! Resolution is best-effort: every directory or cache failure degrades to
//! returning the reference literally, so a flaky store never fails a question.

use std::sync::Arc;

use strsim::levenshtein;
use tracing::{debug, warn};

use graphmind_core::config::ResolverConfig;
use graphmind_core::error::GraphMindResult;
use graphmind_core::traits::{Cache, EntityDirectory};
use graphmind_core::types::{entity_key, CanonicalEntity, MatchKind, ResolvedEntity};

/// Rows fetched for the exact-match lookup.
const EXACT_SEARCH_LIMIT: usize = 20;

/// A fuzzy match and how close it was.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatch<'a> {
    pub entity: &'a CanonicalEntity,
    pub distance: usize,
    pub similarity: f64,
}

/// Find the closest directory entry to `text` by edit distance over canonical
/// names and aliases. The minimum-distance candidate is accepted when its
/// similarity exceeds `min_similarity` or its distance is within
/// `max_edit_distance`. Ties keep the earlier candidate.
pub fn best_fuzzy_match<'a>(
    text: &str,
    candidates: &'a [CanonicalEntity],
    config: &ResolverConfig,
) -> Option<FuzzyMatch<'a>> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let mut best: Option<FuzzyMatch<'a>> = None;
    for entity in candidates {
        for name in std::iter::once(&entity.canonical_name).chain(entity.aliases.iter()) {
            let hay = name.to_lowercase();
            let distance = levenshtein(&needle, &hay);
            let max_len = needle.chars().count().max(hay.chars().count());
            let similarity = 1.0 - distance as f64 / max_len as f64;

            if best.map_or(true, |b| distance < b.distance) {
                best = Some(FuzzyMatch {
                    entity,
                    distance,
                    similarity,
                });
            }
        }
    }

    best.filter(|m| m.similarity > config.min_similarity || m.distance <= config.max_edit_distance)
}

/// Resolves textual references to canonical entities.
pub struct EntityResolver {
    directory: Arc<dyn EntityDirectory>,
    cache: Option<Arc<dyn Cache>>,
    config: ResolverConfig,
}

impl EntityResolver {
    /// Create a resolver without a cache.
    pub fn new(directory: Arc<dyn EntityDirectory>, config: ResolverConfig) -> Self {
        Self {
            directory,
            cache: None,
            config,
        }
    }

    /// Attach a cache for resolved references.
    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    fn cache_key(user_id: &str, text: &str) -> String {
        format!("resolve:{}:{}", user_id, text.trim().to_lowercase())
    }

    /// Resolve one reference. Never fails.
    pub async fn resolve(&self, text: &str, user_id: &str) -> ResolvedEntity {
        let text = text.trim();
        if text.is_empty() {
            return ResolvedEntity::unresolved(text);
        }

        if let Some(cached) = self.cached(user_id, text).await {
            return cached;
        }

        match self.lookup(text, user_id).await {
            Ok(Some(resolved)) => {
                self.remember(user_id, text, &resolved).await;
                resolved
            }
            Ok(None) => ResolvedEntity::unresolved(text),
            Err(e) => {
                warn!(error = %e, "Entity directory lookup failed, using reference literally");
                ResolvedEntity::unresolved(text)
            }
        }
    }

    /// Resolve every reference, preserving order.
    pub async fn resolve_all<S: AsRef<str>>(&self, texts: &[S], user_id: &str) -> Vec<ResolvedEntity> {
        let mut resolved = Vec::with_capacity(texts.len());
        for text in texts {
            resolved.push(self.resolve(text.as_ref(), user_id).await);
        }
        resolved
    }

    /// Exact match first, then fuzzy over the whole directory.
    async fn lookup(&self, text: &str, user_id: &str) -> GraphMindResult<Option<ResolvedEntity>> {
        if let Some(entity) = self.find_exact(text, user_id).await? {
            debug!(entity_type = %entity.entity_type, "Resolved reference exactly");
            return Ok(Some(ResolvedEntity::from_entity(&entity, MatchKind::Exact)));
        }

        let candidates = self
            .directory
            .list(user_id, None, self.config.candidate_limit)
            .await?;

        Ok(best_fuzzy_match(text, &candidates, &self.config).map(|m| {
            debug!(
                distance = m.distance,
                similarity = m.similarity,
                "Resolved reference by edit distance"
            );
            ResolvedEntity::from_entity(m.entity, MatchKind::Fuzzy)
        }))
    }

    async fn find_exact(&self, text: &str, user_id: &str) -> GraphMindResult<Option<CanonicalEntity>> {
        let rows = self.directory.search(user_id, text, EXACT_SEARCH_LIMIT).await?;
        Ok(rows.into_iter().find(|e| e.has_name(text)))
    }

    async fn cached(&self, user_id: &str, text: &str) -> Option<ResolvedEntity> {
        let cache = self.cache.as_ref()?;
        match cache.get(&Self::cache_key(user_id, text)).await {
            Ok(Some(raw)) => match serde_json::from_str::<ResolvedEntity>(&raw) {
                Ok(mut resolved) => {
                    resolved.match_kind = MatchKind::Cached;
                    Some(resolved)
                }
                Err(e) => {
                    debug!(error = %e, "Ignoring undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!(error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn remember(&self, user_id: &str, text: &str, resolved: &ResolvedEntity) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        let Ok(raw) = serde_json::to_string(resolved) else {
            return;
        };
        if let Err(e) = cache
            .put(&Self::cache_key(user_id, text), &raw, self.config.cache_ttl())
            .await
        {
            debug!(error = %e, "Cache write failed");
        }
    }

    /// Record that `name` was mentioned.
    ///
    /// A name that resolves to an existing entity bumps its mention count and
    /// becomes an alias if the surface form is new. Anything else creates a
    /// new canonical entity. Unlike [`resolve`](Self::resolve), directory
    /// errors propagate here.
    pub async fn register_mention(
        &self,
        user_id: &str,
        name: &str,
        entity_type: &str,
        mention_id: Option<&str>,
    ) -> GraphMindResult<CanonicalEntity> {
        let name = name.trim();

        let existing = match self.find_exact(name, user_id).await? {
            Some(entity) => Some(entity),
            None => match self.directory.get(user_id, &entity_key(name)).await? {
                Some(entity) => Some(entity),
                None => {
                    let candidates = self
                        .directory
                        .list(user_id, None, self.config.candidate_limit)
                        .await?;
                    best_fuzzy_match(name, &candidates, &self.config).map(|m| m.entity.clone())
                }
            },
        };

        let entity = match existing {
            Some(mut entity) => {
                entity.ensure_canonical_alias();
                entity.add_alias(name);
                entity.record_mention(mention_id);
                entity
            }
            None => {
                let mut entity = CanonicalEntity::new(user_id, name, entity_type);
                if let Some(id) = mention_id {
                    entity = entity.with_first_mention(id);
                }
                debug!(entity_type, "Creating canonical entity for new mention");
                entity
            }
        };

        self.directory.upsert(&entity).await?;
        Ok(entity)
    }
}
