//! Values returned by a graph store, decoded at the store boundary.
//!
//! Stores translate their wire format into [`GraphValue`] so nothing
//! downstream has to guess whether a value is a node or an edge.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: i64,
    pub labels: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphNode {
    pub fn new(id: i64, labels: Vec<String>) -> Self {
        Self {
            id,
            labels,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// First label, used as the entity type.
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

/// A relationship as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub id: i64,
    pub rel_type: String,
    pub source_id: i64,
    pub target_id: i64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphRelationship {
    pub fn new(id: i64, rel_type: impl Into<String>, source_id: i64, target_id: i64) -> Self {
        Self {
            id,
            rel_type: rel_type.into(),
            source_id,
            target_id,
            properties: Map::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

/// Tagged union over everything a result cell can hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GraphValue {
    Node(GraphNode),
    Relationship(GraphRelationship),
    Scalar(Value),
    List(Vec<GraphValue>),
}

impl GraphValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::Scalar(value.into())
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// True if this value or anything nested in it is a node or relationship.
    pub fn contains_graph_element(&self) -> bool {
        match self {
            Self::Node(_) | Self::Relationship(_) => true,
            Self::Scalar(_) => false,
            Self::List(items) => items.iter().any(GraphValue::contains_graph_element),
        }
    }

    /// Plain JSON view, used when a cell carries no graph element.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Scalar(v) => v.clone(),
            Self::List(items) => Value::Array(items.iter().map(GraphValue::to_json).collect()),
            Self::Node(n) => serde_json::json!({
                "id": n.id,
                "labels": n.labels,
                "properties": n.properties,
            }),
            Self::Relationship(r) => serde_json::json!({
                "id": r.id,
                "type": r.rel_type,
                "source": r.source_id,
                "target": r.target_id,
                "properties": r.properties,
            }),
        }
    }
}

/// Write counters reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub nodes_created: u64,
    pub nodes_deleted: u64,
    pub relationships_created: u64,
    pub relationships_deleted: u64,
    pub properties_set: u64,
    pub labels_added: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
}

/// Rows of one executed statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<GraphValue>>,
    #[serde(default)]
    pub stats: ExecutionStats,
}

impl GraphRows {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<GraphValue>>) -> Self {
        Self {
            columns,
            rows,
            stats: ExecutionStats::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Cell by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&GraphValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }
}
