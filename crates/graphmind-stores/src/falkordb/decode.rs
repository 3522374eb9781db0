//! Decoding of verbose `GRAPH.QUERY` replies into [`GraphRows`].
//!
//! A reply is either `[statistics]` for statements without a result set or
//! `[header, rows, statistics]`. In verbose mode nodes, relationships and
//! paths arrive as lists of `[key, value]` pairs and are recognised by
//! their keys.

use redis::Value as RedisValue;
use serde_json::{Map, Value};

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::types::{ExecutionStats, GraphNode, GraphRelationship, GraphRows, GraphValue};

fn text(value: &RedisValue) -> Option<String> {
    match value {
        RedisValue::Data(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        RedisValue::Status(s) => Some(s.clone()),
        RedisValue::Okay => Some("OK".to_string()),
        _ => None,
    }
}

/// `[[key, value], ...]` as borrowed pairs, if every item has that shape.
fn pairs(items: &[RedisValue]) -> Option<Vec<(String, &RedisValue)>> {
    if items.is_empty() {
        return None;
    }
    items
        .iter()
        .map(|item| match item {
            RedisValue::Bulk(pair) if pair.len() == 2 => Some((text(&pair[0])?, &pair[1])),
            _ => None,
        })
        .collect()
}

fn field<'a>(fields: &'a [(String, &'a RedisValue)], key: &str) -> Option<&'a RedisValue> {
    fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
}

fn has_keys(fields: &[(String, &RedisValue)], keys: &[&str]) -> bool {
    keys.iter().all(|k| field(fields, k).is_some())
}

fn int(value: Option<&RedisValue>) -> Option<i64> {
    match value? {
        RedisValue::Int(i) => Some(*i),
        other => text(other)?.parse().ok(),
    }
}

fn properties(value: Option<&RedisValue>) -> Map<String, Value> {
    let mut map = Map::new();
    if let Some(RedisValue::Bulk(items)) = value {
        for item in items {
            if let RedisValue::Bulk(pair) = item {
                if let (Some(key), Some(v)) = (pair.first().and_then(text), pair.get(1)) {
                    map.insert(key, decode_value(v).to_json());
                }
            }
        }
    }
    map
}

fn node(fields: &[(String, &RedisValue)]) -> Option<GraphNode> {
    let labels = match field(fields, "labels")? {
        RedisValue::Bulk(items) => items.iter().filter_map(text).collect(),
        other => vec![text(other)?],
    };
    let mut node = GraphNode::new(int(field(fields, "id"))?, labels);
    node.properties = properties(field(fields, "properties"));
    Some(node)
}

fn relationship(fields: &[(String, &RedisValue)]) -> Option<GraphRelationship> {
    let mut rel = GraphRelationship::new(
        int(field(fields, "id"))?,
        text(field(fields, "type")?)?,
        int(field(fields, "src_node"))?,
        int(field(fields, "dest_node"))?,
    );
    rel.properties = properties(field(fields, "properties"));
    Some(rel)
}

/// Nodes and edges of a path, interleaved in path order.
fn path(fields: &[(String, &RedisValue)]) -> Option<GraphValue> {
    let decode_all = |key: &str| match field(fields, key) {
        Some(RedisValue::Bulk(items)) => items.iter().map(decode_value).collect::<Vec<_>>(),
        _ => Vec::new(),
    };
    let nodes = decode_all("nodes");
    let mut edges = decode_all("edges").into_iter();

    let mut elements = Vec::with_capacity(nodes.len() * 2);
    for node in nodes {
        elements.push(node);
        if let Some(edge) = edges.next() {
            elements.push(edge);
        }
    }
    Some(GraphValue::List(elements))
}

fn structured(items: &[RedisValue]) -> Option<GraphValue> {
    let fields = pairs(items)?;
    if has_keys(&fields, &["id", "labels"]) {
        node(&fields).map(GraphValue::Node)
    } else if has_keys(&fields, &["id", "type", "src_node", "dest_node"]) {
        relationship(&fields).map(GraphValue::Relationship)
    } else if has_keys(&fields, &["nodes", "edges"]) {
        path(&fields)
    } else {
        None
    }
}

/// Decode one result cell.
pub fn decode_value(value: &RedisValue) -> GraphValue {
    match value {
        RedisValue::Nil => GraphValue::Scalar(Value::Null),
        RedisValue::Int(i) => GraphValue::scalar(*i),
        RedisValue::Bulk(items) => {
            structured(items).unwrap_or_else(|| GraphValue::List(items.iter().map(decode_value).collect()))
        }
        other => GraphValue::Scalar(text(other).map_or(Value::Null, Value::String)),
    }
}

/// Parse `"Nodes created: 2"` style statistics lines.
pub fn decode_stats(lines: &[RedisValue]) -> ExecutionStats {
    let mut stats = ExecutionStats::default();
    for line in lines.iter().filter_map(text) {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let number = rest.split_whitespace().next().unwrap_or("");
        let count = || number.parse::<u64>().unwrap_or(0);
        match key.trim() {
            "Nodes created" => stats.nodes_created = count(),
            "Nodes deleted" => stats.nodes_deleted = count(),
            "Relationships created" => stats.relationships_created = count(),
            "Relationships deleted" => stats.relationships_deleted = count(),
            "Properties set" => stats.properties_set = count(),
            "Labels added" => stats.labels_added = count(),
            "Query internal execution time" => stats.execution_time_ms = number.parse().ok(),
            _ => {}
        }
    }
    stats
}

fn column_name(value: &RedisValue) -> Option<String> {
    match value {
        // Some server versions send `[type, name]` even in verbose mode.
        RedisValue::Bulk(parts) => parts.last().and_then(text),
        other => text(other),
    }
}

/// Decode a whole reply.
pub fn decode_reply(reply: &RedisValue) -> GraphMindResult<GraphRows> {
    let sections = match reply {
        RedisValue::Bulk(sections) => sections,
        _ => return Err(GraphMindError::graph_store("Unexpected graph reply shape")),
    };

    match sections.as_slice() {
        [RedisValue::Bulk(stats)] => Ok(GraphRows {
            stats: decode_stats(stats),
            ..Default::default()
        }),
        [RedisValue::Bulk(header), RedisValue::Bulk(rows), RedisValue::Bulk(stats)] => {
            let columns = header.iter().filter_map(column_name).collect();
            let rows = rows
                .iter()
                .map(|row| match row {
                    RedisValue::Bulk(cells) => cells.iter().map(decode_value).collect(),
                    other => vec![decode_value(other)],
                })
                .collect();
            Ok(GraphRows {
                columns,
                rows,
                stats: decode_stats(stats),
            })
        }
        _ => Err(GraphMindError::graph_store(format!(
            "Unexpected graph reply with {} sections",
            sections.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> RedisValue {
        RedisValue::Data(v.as_bytes().to_vec())
    }

    fn pair(k: &str, v: RedisValue) -> RedisValue {
        RedisValue::Bulk(vec![s(k), v])
    }

    fn node_value(id: i64, label: &str, name: &str) -> RedisValue {
        RedisValue::Bulk(vec![
            pair("id", RedisValue::Int(id)),
            pair("labels", RedisValue::Bulk(vec![s(label)])),
            pair("properties", RedisValue::Bulk(vec![pair("name", s(name))])),
        ])
    }

    fn edge_value(id: i64, rel_type: &str, src: i64, dest: i64) -> RedisValue {
        RedisValue::Bulk(vec![
            pair("id", RedisValue::Int(id)),
            pair("type", s(rel_type)),
            pair("src_node", RedisValue::Int(src)),
            pair("dest_node", RedisValue::Int(dest)),
            pair("properties", RedisValue::Bulk(vec![pair("since", RedisValue::Int(2025))])),
        ])
    }

    fn stats(lines: &[&str]) -> RedisValue {
        RedisValue::Bulk(lines.iter().map(|l| s(l)).collect())
    }

    #[test]
    fn test_nodes_and_relationships() {
        let reply = RedisValue::Bulk(vec![
            RedisValue::Bulk(vec![s("a"), s("r"), s("b")]),
            RedisValue::Bulk(vec![RedisValue::Bulk(vec![
                node_value(0, "Person", "Alice"),
                edge_value(3, "WORKS_ON", 0, 1),
                node_value(1, "Project", "GraphMind"),
            ])]),
            stats(&["Cached execution: 0", "Query internal execution time: 0.42 milliseconds"]),
        ]);

        let rows = decode_reply(&reply).unwrap();
        assert_eq!(rows.columns, vec!["a", "r", "b"]);
        match rows.get(0, "a") {
            Some(GraphValue::Node(n)) => {
                assert_eq!(n.labels, vec!["Person"]);
                assert_eq!(n.properties["name"], "Alice");
            }
            other => panic!("expected node, got {:?}", other),
        }
        match rows.get(0, "r") {
            Some(GraphValue::Relationship(r)) => {
                assert_eq!((r.source_id, r.target_id), (0, 1));
                assert_eq!(r.rel_type, "WORKS_ON");
                assert_eq!(r.properties["since"], 2025);
            }
            other => panic!("expected relationship, got {:?}", other),
        }
        assert_eq!(rows.stats.execution_time_ms, Some(0.42));
    }

    #[test]
    fn test_scalars_and_lists() {
        let reply = RedisValue::Bulk(vec![
            RedisValue::Bulk(vec![s("count"), s("names"), s("missing")]),
            RedisValue::Bulk(vec![RedisValue::Bulk(vec![
                RedisValue::Int(3),
                RedisValue::Bulk(vec![s("Alice"), s("Bob")]),
                RedisValue::Nil,
            ])]),
            stats(&[]),
        ]);
        let rows = decode_reply(&reply).unwrap();
        assert_eq!(rows.get(0, "count"), Some(&GraphValue::scalar(3)));
        assert_eq!(
            rows.get(0, "names"),
            Some(&GraphValue::List(vec![GraphValue::scalar("Alice"), GraphValue::scalar("Bob")]))
        );
        assert_eq!(rows.get(0, "missing"), Some(&GraphValue::Scalar(Value::Null)));
    }

    #[test]
    fn test_path_interleaves_nodes_and_edges() {
        let path_value = RedisValue::Bulk(vec![
            pair("nodes", RedisValue::Bulk(vec![node_value(0, "Person", "A"), node_value(1, "Person", "B")])),
            pair("edges", RedisValue::Bulk(vec![edge_value(7, "KNOWS", 0, 1)])),
        ]);
        match decode_value(&path_value) {
            GraphValue::List(items) => {
                assert_eq!(items.len(), 3);
                assert!(matches!(items[1], GraphValue::Relationship(_)));
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn test_write_only_reply_has_stats() {
        let reply = RedisValue::Bulk(vec![stats(&[
            "Labels added: 2",
            "Nodes created: 5",
            "Properties set: 12",
            "Relationships deleted: 1",
        ])]);
        let rows = decode_reply(&reply).unwrap();
        assert!(rows.is_empty());
        assert_eq!(rows.stats.nodes_created, 5);
        assert_eq!(rows.stats.labels_added, 2);
        assert_eq!(rows.stats.properties_set, 12);
        assert_eq!(rows.stats.relationships_deleted, 1);
    }

    #[test]
    fn test_unexpected_shapes_are_errors() {
        assert!(decode_reply(&RedisValue::Int(1)).is_err());
        assert!(decode_reply(&RedisValue::Bulk(vec![RedisValue::Int(1), RedisValue::Int(2)])).is_err());
    }
}
