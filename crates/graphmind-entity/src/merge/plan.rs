//! Pure merge planning: property combination, relationship transfer and the
//! ordered statement batch that applies them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use graphmind_core::config::MergeStrategy;
use graphmind_core::traits::GraphStatement;
use graphmind_core::types::{Direction, GraphNode, GraphRelationship};

/// Properties that identify a node and never move between entities.
const IDENTITY_KEYS: &[&str] = &["entity_key", "name", "user_id"];

/// A relationship seen from one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub rel_type: String,
    pub direction: Direction,
    /// Store id of the node at the other end. For a loop, the node itself.
    pub other_id: i64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl EdgeSnapshot {
    /// View `rel` from `node_id`. Edges not touching the node yield `None`.
    pub fn from_relationship(node_id: i64, rel: &GraphRelationship) -> Option<Self> {
        let (direction, other_id) = match (rel.source_id == node_id, rel.target_id == node_id) {
            (true, true) => (Direction::Loop, node_id),
            (true, false) => (Direction::Outgoing, rel.target_id),
            (false, true) => (Direction::Incoming, rel.source_id),
            (false, false) => return None,
        };
        Some(Self {
            rel_type: rel.rel_type.clone(),
            direction,
            other_id,
            properties: rel.properties.clone(),
        })
    }

    /// Loops carry over to whichever node owns them, so their endpoint id is
    /// not part of the identity.
    fn identity(&self) -> (&str, Direction, Option<i64>) {
        let other = (self.direction != Direction::Loop).then_some(self.other_id);
        (self.rel_type.as_str(), self.direction, other)
    }
}

/// A node and its relationships as loaded from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSnapshot {
    pub node: GraphNode,
    pub edges: Vec<EdgeSnapshot>,
}

/// Combine two property maps. Identity keys always stay as the target has
/// them. Returns the merged map and how many values came from the source.
pub fn merge_properties(
    target: &Map<String, Value>,
    source: &Map<String, Value>,
    strategy: MergeStrategy,
) -> (Map<String, Value>, usize) {
    let mut merged = target.clone();
    let mut taken = 0;

    for (key, value) in source {
        if IDENTITY_KEYS.contains(&key.as_str()) || value.is_null() {
            continue;
        }
        let take = match strategy {
            MergeStrategy::TargetWins => merged.get(key).map_or(true, Value::is_null),
            MergeStrategy::SourceWins => merged.get(key) != Some(value),
        };
        if take {
            merged.insert(key.clone(), value.clone());
            taken += 1;
        }
    }

    (merged, taken)
}

/// Pick the source relationships to re-create on the target.
///
/// Edges pointing at the target itself are dropped, as are edges the target
/// already has (same type, direction and other endpoint). A loop on the source
/// becomes a loop on the target. Running this again after a transfer
/// therefore yields nothing.
pub fn plan_transfers(
    source_edges: &[EdgeSnapshot],
    target_edges: &[EdgeSnapshot],
    target_id: i64,
) -> (Vec<EdgeSnapshot>, usize) {
    let mut present: HashSet<(&str, Direction, Option<i64>)> =
        target_edges.iter().map(EdgeSnapshot::identity).collect();
    let mut transfers = Vec::new();
    let mut skipped = 0;

    for edge in source_edges {
        if edge.direction != Direction::Loop && edge.other_id == target_id {
            continue;
        }
        if present.insert(edge.identity()) {
            transfers.push(edge.clone());
        } else {
            skipped += 1;
        }
    }

    (transfers, skipped)
}

/// Whether `s` can appear in statement text without quoting.
pub fn is_safe_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Relationship type as statement text: plain identifiers as they are,
/// anything else backtick-quoted with embedded backticks doubled.
pub fn quote_identifier(s: &str) -> String {
    if is_safe_identifier(s) {
        s.to_string()
    } else {
        format!("`{}`", s.replace('`', "``"))
    }
}

/// Everything a merge will do, computed before anything is written.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub source_key: String,
    pub target_key: String,
    pub merged_properties: Map<String, Value>,
    pub properties_merged: usize,
    pub transfers: Vec<EdgeSnapshot>,
    pub relationships_skipped: usize,
}

impl MergePlan {
    /// Build a plan from loaded snapshots.
    pub fn new(
        source_key: &str,
        target_key: &str,
        source: &NodeSnapshot,
        target: &NodeSnapshot,
        strategy: MergeStrategy,
    ) -> Self {
        let (merged_properties, properties_merged) =
            merge_properties(&target.node.properties, &source.node.properties, strategy);
        let (transfers, relationships_skipped) =
            plan_transfers(&source.edges, &target.edges, target.node.id);

        Self {
            source_key: source_key.to_string(),
            target_key: target_key.to_string(),
            merged_properties,
            properties_merged,
            transfers,
            relationships_skipped,
        }
    }

    /// Ordered batch: transfers, target properties, source deletion.
    ///
    /// Transfers use `MERGE`, so replaying the batch never duplicates an edge.
    pub fn statements(&self) -> Vec<GraphStatement> {
        let mut statements = Vec::with_capacity(self.transfers.len() + 2);

        for edge in &self.transfers {
            let rel_type = quote_identifier(&edge.rel_type);
            let statement = match edge.direction {
                Direction::Loop => GraphStatement::new(format!(
                    "MATCH (t {{entity_key: $target_key}}) \
                     MERGE (t)-[r:{}]->(t) ON CREATE SET r += $props",
                    rel_type
                )),
                Direction::Outgoing | Direction::Incoming => {
                    let pattern = if edge.direction == Direction::Outgoing {
                        format!("(t)-[r:{}]->(o)", rel_type)
                    } else {
                        format!("(t)<-[r:{}]-(o)", rel_type)
                    };
                    GraphStatement::new(format!(
                        "MATCH (t {{entity_key: $target_key}}) MATCH (o) WHERE id(o) = $other_id \
                         MERGE {} ON CREATE SET r += $props",
                        pattern
                    ))
                    .param("other_id", edge.other_id)
                }
            };
            statements.push(
                statement
                    .param("target_key", self.target_key.clone())
                    .param("props", Value::Object(edge.properties.clone())),
            );
        }

        statements.push(
            GraphStatement::new("MATCH (t {entity_key: $target_key}) SET t += $props")
                .param("target_key", self.target_key.clone())
                .param("props", Value::Object(self.merged_properties.clone())),
        );

        statements.push(
            GraphStatement::new("MATCH (s {entity_key: $source_key}) DETACH DELETE s")
                .param("source_key", self.source_key.clone()),
        );

        statements
    }
}
