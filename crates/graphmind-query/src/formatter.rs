//! Reshapes decoded graph rows into entities, relationships and scalars.

use std::collections::HashSet;

use serde_json::{Map, Value};

use graphmind_core::types::{
    GraphNode, GraphRelationship, GraphRows, GraphValue, QueryResult, ResultEntity,
    ResultMetadata, ResultRelationship, ResultShape,
};

const COUNT_COLUMN: &str = "count";
const LABEL_COLUMN: &str = "label";
const UNLABELLED: &str = "Node";

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Display name of a node: `name`, then `title`, then an `id` property,
/// then `"<Type> #<id>"`.
pub fn display_name(node: &GraphNode) -> String {
    ["name", "title", "id"]
        .iter()
        .find_map(|key| node.properties.get(*key).and_then(value_text))
        .unwrap_or_else(|| {
            format!("{} #{}", node.primary_label().unwrap_or(UNLABELLED), node.id)
        })
}

#[derive(Default)]
struct Collector {
    result: QueryResult,
    seen_entities: HashSet<(String, i64)>,
    seen_relationships: HashSet<(i64, String, i64)>,
}

impl Collector {
    fn visit(&mut self, value: &GraphValue) {
        match value {
            GraphValue::Node(node) => self.add_node(node),
            GraphValue::Relationship(rel) => self.add_relationship(rel),
            GraphValue::List(items) => items.iter().for_each(|item| self.visit(item)),
            GraphValue::Scalar(_) => {}
        }
    }

    fn add_node(&mut self, node: &GraphNode) {
        let entity_type = node.primary_label().unwrap_or(UNLABELLED).to_string();
        if !self.seen_entities.insert((entity_type.clone(), node.id)) {
            return;
        }
        self.result.entities.push(ResultEntity {
            id: node.id.to_string(),
            entity_type,
            name: display_name(node),
            properties: node.properties.clone(),
        });
    }

    fn add_relationship(&mut self, rel: &GraphRelationship) {
        let key = (rel.source_id, rel.rel_type.clone(), rel.target_id);
        if !self.seen_relationships.insert(key) {
            return;
        }
        self.result.relationships.push(ResultRelationship {
            source: rel.source_id.to_string(),
            target: rel.target_id.to_string(),
            rel_type: rel.rel_type.clone(),
            properties: rel.properties.clone(),
        });
    }
}

fn base_metadata(rows: &GraphRows, shape: ResultShape) -> ResultMetadata {
    ResultMetadata {
        shape,
        row_count: rows.len(),
        columns: rows.columns.clone(),
        execution_time_ms: rows.stats.execution_time_ms,
        ..Default::default()
    }
}

/// Generic shape: every node and relationship, deduplicated in first-seen
/// order. Rows holding neither become scalar maps keyed by column.
pub fn format_rows(rows: &GraphRows) -> QueryResult {
    let mut collector = Collector::default();

    for row in &rows.rows {
        if row.iter().any(GraphValue::contains_graph_element) {
            row.iter().for_each(|value| collector.visit(value));
        } else {
            let scalars: Map<String, Value> = rows
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.clone(), value.to_json()))
                .collect();
            collector.result.scalars.push(scalars);
        }
    }

    let mut result = collector.result;
    result.metadata = base_metadata(rows, ResultShape::Generic);
    result
}

/// Whether `rows` is a single row of `count` (and optionally `label`).
pub fn is_count_shape(rows: &GraphRows) -> bool {
    rows.len() == 1
        && rows.columns.iter().any(|c| c == COUNT_COLUMN)
        && rows
            .columns
            .iter()
            .all(|c| c == COUNT_COLUMN || c == LABEL_COLUMN)
}

/// Count shape: the count and label lifted into metadata.
pub fn format_count(rows: &GraphRows) -> QueryResult {
    let mut metadata = base_metadata(rows, ResultShape::Count);
    metadata.count = rows
        .get(0, COUNT_COLUMN)
        .and_then(GraphValue::as_scalar)
        .and_then(Value::as_i64);
    metadata.label = rows
        .get(0, LABEL_COLUMN)
        .and_then(GraphValue::as_scalar)
        .and_then(Value::as_str)
        .map(str::to_string);

    QueryResult {
        metadata,
        ..Default::default()
    }
}

/// Empty shape. The statement and namespace go into a debug-only message
/// that is never serialized.
pub fn format_empty(rows: &GraphRows, statement: &str, namespace: &str) -> QueryResult {
    let mut metadata = base_metadata(rows, ResultShape::Empty);
    metadata.debug_message = Some(format!(
        "No rows for statement {:?} in namespace {}",
        statement, namespace
    ));
    QueryResult {
        metadata,
        ..Default::default()
    }
}

/// Pick the shape from the rows.
pub fn format_auto(rows: &GraphRows, statement: &str, namespace: &str) -> QueryResult {
    if rows.is_empty() {
        format_empty(rows, statement, namespace)
    } else if is_count_shape(rows) {
        format_count(rows)
    } else {
        format_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(id: i64, name: &str) -> GraphValue {
        GraphValue::Node(GraphNode::new(id, vec!["Person".into()]).with_property("name", name))
    }

    #[test]
    fn test_same_node_under_two_columns_is_one_entity() {
        let rows = GraphRows::new(
            vec!["a".into(), "b".into()],
            vec![vec![person(1, "Sarah"), person(1, "Sarah")], vec![person(1, "Sarah"), person(2, "Bob")]],
        );
        let result = format_auto(&rows, "MATCH ...", "g");
        let names: Vec<&str> = result.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Sarah", "Bob"]);
        assert_eq!(result.metadata.shape, ResultShape::Generic);
    }

    #[test]
    fn test_relationships_dedup_and_nested_lists() {
        let rel = GraphValue::Relationship(GraphRelationship::new(9, "KNOWS", 1, 2));
        let rows = GraphRows::new(
            vec!["path".into()],
            vec![
                vec![GraphValue::List(vec![person(1, "Sarah"), rel.clone(), person(2, "Bob")])],
                vec![GraphValue::List(vec![GraphValue::List(vec![rel])])],
            ],
        );
        let result = format_rows(&rows);
        assert_eq!(result.entities.len(), 2);
        assert_eq!(result.relationships.len(), 1);
        assert_eq!(result.relationships[0].source, "1");
        assert_eq!(result.relationships[0].target, "2");
        assert!(result.scalars.is_empty());
    }

    #[test]
    fn test_name_fallback() {
        let titled = GraphNode::new(3, vec!["Document".into()]).with_property("title", "Roadmap");
        assert_eq!(display_name(&titled), "Roadmap");
        let id_only = GraphNode::new(4, vec!["Task".into()]).with_property("id", 77);
        assert_eq!(display_name(&id_only), "77");
        let bare = GraphNode::new(5, vec!["Meeting".into()]).with_property("name", "");
        assert_eq!(display_name(&bare), "Meeting #5");
        assert_eq!(display_name(&GraphNode::new(6, vec![])), "Node #6");
    }

    #[test]
    fn test_count_shape() {
        let rows = GraphRows::new(
            vec!["count".into(), "label".into()],
            vec![vec![GraphValue::scalar(12), GraphValue::scalar("Project")]],
        );
        let result = format_auto(&rows, "MATCH ...", "g");
        assert_eq!(result.metadata.shape, ResultShape::Count);
        assert_eq!(result.metadata.count, Some(12));
        assert_eq!(result.metadata.label.as_deref(), Some("Project"));
    }

    #[test]
    fn test_empty_shape_keeps_debug_out_of_output() {
        let rows = GraphRows::new(vec!["n".into()], vec![]);
        let result = format_auto(&rows, "MATCH (n) RETURN n LIMIT 1", "graphmind_u1");
        assert_eq!(result.metadata.shape, ResultShape::Empty);
        assert!(result.metadata.debug_message.as_deref().unwrap().contains("graphmind_u1"));
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("graphmind_u1"));
    }

    #[test]
    fn test_scalar_rows() {
        let rows = GraphRows::new(
            vec!["name".into(), "n".into()],
            vec![vec![GraphValue::scalar("Sarah"), GraphValue::scalar(3)]],
        );
        let result = format_auto(&rows, "MATCH ...", "g");
        assert_eq!(result.metadata.shape, ResultShape::Generic);
        assert_eq!(result.scalars, vec![json!({"name": "Sarah", "n": 3}).as_object().cloned().unwrap()]);
    }

    #[test]
    fn test_row_with_nested_node_is_not_a_scalar_row() {
        let rows = GraphRows::new(
            vec!["count".into(), "people".into()],
            vec![
                vec![GraphValue::scalar(2), GraphValue::List(vec![GraphValue::List(vec![person(1, "Sarah")])])],
                vec![GraphValue::scalar(0), GraphValue::List(vec![])],
            ],
        );
        let result = format_rows(&rows);
        assert_eq!(result.entities.len(), 1);
        assert_eq!(result.scalars.len(), 1);
        assert_eq!(result.scalars[0]["count"], json!(0));
    }
}
