//! Shape of formatted query results handed back to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An entity extracted from result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntity {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A relationship extracted from result rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRelationship {
    pub source: String,
    pub target: String,
    pub rel_type: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Which shape the formatter picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    Empty,
    Count,
    #[default]
    Generic,
}

/// Summary information about a formatted result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub shape: ResultShape,
    pub row_count: usize,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// Statement and namespace of an empty result. For logs only; never serialized.
    #[serde(skip)]
    pub debug_message: Option<String>,
}

/// Formatted result: entities, relationships and leftover scalar rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub entities: Vec<ResultEntity>,
    pub relationships: Vec<ResultRelationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scalars: Vec<Map<String, Value>>,
    pub metadata: ResultMetadata,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty() && self.scalars.is_empty()
    }
}
