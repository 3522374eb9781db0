//! Duplicate discovery and relationship-preserving entity merges.
//!
//! Discovery scores recent same-type entities with the hybrid similarity in
//! [`crate::similarity`]. A merge moves every relationship of the source
//! node onto the target node, combines properties, deletes the source and
//! finally folds the source's directory record into the target's.

mod plan;

pub use plan::{
    is_safe_identifier, merge_properties, plan_transfers, quote_identifier, EdgeSnapshot, MergePlan,
    NodeSnapshot,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use graphmind_core::config::MergeConfig;
use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::{EntityDirectory, GraphStatement, GraphStore};
use graphmind_core::types::{CanonicalEntity, DuplicateCandidate, GraphValue};

use crate::similarity::calculate_similarity;

/// Outcome of a completed merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeReport {
    pub source_key: String,
    pub target_key: String,
    pub relationships_transferred: usize,
    /// Source relationships the target already had.
    pub relationships_skipped: usize,
    pub properties_merged: usize,
    /// Whether the directory record was folded into the target.
    pub directory_updated: bool,
}

/// Score `candidates` against `entity`, keeping same-type entries other than
/// `entity` itself at or above `threshold`, best first.
pub fn rank_candidates(
    entity: &CanonicalEntity,
    candidates: &[CanonicalEntity],
    threshold: f64,
) -> Vec<DuplicateCandidate> {
    let mut ranked: Vec<DuplicateCandidate> = candidates
        .iter()
        .filter(|c| c.entity_key != entity.entity_key && c.entity_type == entity.entity_type)
        .filter_map(|c| {
            let score = calculate_similarity(&entity.canonical_name, &c.canonical_name);
            (score >= threshold).then(|| DuplicateCandidate {
                entity_key: c.entity_key.clone(),
                name: c.canonical_name.clone(),
                entity_type: c.entity_type.clone(),
                similarity_score: score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    ranked
}

/// Fold `source` into `target`: aliases, mention counts, confidence and the
/// first mention.
pub fn absorb_record(target: &mut CanonicalEntity, source: &CanonicalEntity) {
    target.ensure_canonical_alias();
    target.add_alias(source.canonical_name.clone());
    for alias in &source.aliases {
        target.add_alias(alias.clone());
    }
    target.mention_count += source.mention_count;
    target.confidence = target.confidence.max(source.confidence);
    if source.created_at < target.created_at {
        target.created_at = source.created_at;
        if source.first_mentioned_id.is_some() {
            target.first_mentioned_id = source.first_mentioned_id.clone();
        }
    } else if target.first_mentioned_id.is_none() {
        target.first_mentioned_id = source.first_mentioned_id.clone();
    }
    target.updated_at = chrono::Utc::now();
}

/// Finds and merges duplicate entities.
pub struct EntityMergeEngine {
    graph: Arc<dyn GraphStore>,
    directory: Arc<dyn EntityDirectory>,
    config: MergeConfig,
}

impl EntityMergeEngine {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        directory: Arc<dyn EntityDirectory>,
        config: MergeConfig,
    ) -> Self {
        Self {
            graph,
            directory,
            config,
        }
    }

    pub fn config(&self) -> &MergeConfig {
        &self.config
    }

    /// Likely duplicates of `entity` among the user's most recent entities of
    /// the same type.
    pub async fn find_duplicates(
        &self,
        entity: &CanonicalEntity,
    ) -> GraphMindResult<Vec<DuplicateCandidate>> {
        let recent = self
            .directory
            .list(
                &entity.user_id,
                Some(&entity.entity_type),
                self.config.recency_window,
            )
            .await?;

        let ranked = rank_candidates(entity, &recent, self.config.similarity_threshold);
        debug!(
            scanned = recent.len(),
            found = ranked.len(),
            "Duplicate scan complete"
        );
        Ok(ranked)
    }

    /// Merge the entity keyed `source_key` into `target_key` inside
    /// `namespace`.
    ///
    /// Statements run in order and are not rolled back: a failure part way
    /// leaves earlier transfers in place. Re-running the merge after such a
    /// failure is safe since transfers skip edges the target already has.
    pub async fn merge(
        &self,
        namespace: &str,
        user_id: &str,
        source_key: &str,
        target_key: &str,
    ) -> GraphMindResult<MergeReport> {
        if source_key == target_key {
            return Err(GraphMindError::validation(
                "Cannot merge an entity into itself",
            ));
        }

        let source = self.load_snapshot(namespace, source_key).await?;
        let target = self.load_snapshot(namespace, target_key).await?;

        let plan = MergePlan::new(source_key, target_key, &source, &target, self.config.strategy);
        let statements = plan.statements();

        debug!(
            transfers = plan.transfers.len(),
            skipped = plan.relationships_skipped,
            properties = plan.properties_merged,
            "Applying merge plan"
        );

        if let Err(e) = self.graph.execute_batch(namespace, &statements).await {
            warn!(error = %e, "Merge batch failed");
            return Err(GraphMindError::merge_failed(
                e.to_string(),
                plan.transfers.len(),
                plan.properties_merged,
            ));
        }

        let directory_updated = self.merge_records(user_id, source_key, target_key).await?;

        info!(
            transferred = plan.transfers.len(),
            properties = plan.properties_merged,
            "Entities merged"
        );

        Ok(MergeReport {
            source_key: source_key.to_string(),
            target_key: target_key.to_string(),
            relationships_transferred: plan.transfers.len(),
            relationships_skipped: plan.relationships_skipped,
            properties_merged: plan.properties_merged,
            directory_updated,
        })
    }

    async fn load_snapshot(&self, namespace: &str, key: &str) -> GraphMindResult<NodeSnapshot> {
        let node_rows = self
            .graph
            .execute_read_only(
                namespace,
                &GraphStatement::new("MATCH (n {entity_key: $key}) RETURN n LIMIT 1")
                    .param("key", key),
            )
            .await?;

        let node = node_rows
            .rows
            .iter()
            .flatten()
            .find_map(|v| match v {
                GraphValue::Node(n) => Some(n.clone()),
                _ => None,
            })
            .ok_or_else(|| GraphMindError::entity_not_found(key))?;

        let rel_rows = self
            .graph
            .execute_read_only(
                namespace,
                &GraphStatement::new("MATCH (n {entity_key: $key})-[r]-(o) RETURN r")
                    .param("key", key),
            )
            .await?;

        let edges = rel_rows
            .rows
            .iter()
            .flatten()
            .filter_map(|v| match v {
                GraphValue::Relationship(r) => EdgeSnapshot::from_relationship(node.id, r),
                _ => None,
            })
            .collect();

        Ok(NodeSnapshot { node, edges })
    }

    /// Fold the source's directory record into the target's. Missing records
    /// are tolerated since graph nodes may exist without one.
    async fn merge_records(
        &self,
        user_id: &str,
        source_key: &str,
        target_key: &str,
    ) -> GraphMindResult<bool> {
        let source = self.directory.get(user_id, source_key).await?;
        let target = self.directory.get(user_id, target_key).await?;

        match (source, target) {
            (Some(source), Some(mut target)) => {
                absorb_record(&mut target, &source);
                self.directory.upsert(&target).await?;
                self.directory.delete(user_id, source_key).await?;
                Ok(true)
            }
            (Some(_), None) => {
                warn!("Target has no directory record, leaving source record in place");
                Ok(false)
            }
            (None, _) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_candidates_filters_and_sorts() {
        let entity = CanonicalEntity::new("u1", "John Smith", "Person");
        let candidates = vec![
            CanonicalEntity::new("u1", "John Smith", "Person"),
            CanonicalEntity::new("u1", "J. Smith", "Person"),
            CanonicalEntity::new("u1", "Dr. John Smith", "Person"),
            CanonicalEntity::new("u1", "John Smith", "Project"),
            CanonicalEntity::new("u1", "Alice Jones", "Person"),
        ];

        let ranked = rank_candidates(&entity, &candidates, 0.85);
        let names: Vec<&str> = ranked.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dr. John Smith", "J. Smith"]);
        assert!(ranked[0].similarity_score >= ranked[1].similarity_score);
    }

    #[test]
    fn test_absorb_record() {
        let mut target = CanonicalEntity::new("u1", "John Smith", "Person").with_confidence(0.7);
        target.mention_count = 3;
        let mut source = CanonicalEntity::new("u1", "Johnny Smith", "Person")
            .with_aliases(["JS"])
            .with_confidence(0.9)
            .with_first_mention("m-1");
        source.mention_count = 2;
        source.created_at = target.created_at - chrono::Duration::days(1);

        absorb_record(&mut target, &source);
        assert_eq!(target.mention_count, 5);
        assert!((target.confidence - 0.9).abs() < f32::EPSILON);
        assert!(target.has_name("Johnny Smith"));
        assert!(target.has_name("JS"));
        assert!(target.has_name("John Smith"));
        assert_eq!(target.first_mentioned_id.as_deref(), Some("m-1"));
        assert_eq!(target.created_at, source.created_at);
    }
}
