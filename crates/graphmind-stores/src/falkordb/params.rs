//! Parameter binding through the `CYPHER name=value ...` query prefix.
//!
//! FalkorDB takes parameters as openCypher literals in front of the query
//! text, so every value is rendered as a literal here. Strings are always
//! double-quoted and escaped; parameter names must be plain identifiers.

use serde_json::{Map, Value};

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::GraphStatement;

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn push_string_literal(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn push_map_key(out: &mut String, key: &str) {
    if is_identifier(key) {
        out.push_str(key);
    } else {
        out.push('`');
        out.push_str(&key.replace('`', "``"));
        out.push('`');
    }
}

fn push_literal(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => push_string_literal(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_literal(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                push_map_key(out, key);
                out.push_str(": ");
                push_literal(out, item);
            }
            out.push('}');
        }
    }
}

/// Render one value as an openCypher literal.
pub fn encode_value(value: &Value) -> String {
    let mut out = String::new();
    push_literal(&mut out, value);
    out
}

/// `CYPHER a=1 b="x" ` for the given parameters, empty when there are none.
pub fn parameter_prefix(parameters: &Map<String, Value>) -> GraphMindResult<String> {
    if parameters.is_empty() {
        return Ok(String::new());
    }

    let mut out = String::from("CYPHER");
    for (name, value) in parameters {
        if !is_identifier(name) {
            return Err(GraphMindError::validation(format!(
                "Parameter name {:?} is not a plain identifier",
                name
            )));
        }
        out.push(' ');
        out.push_str(name);
        out.push('=');
        push_literal(&mut out, value);
    }
    out.push(' ');
    Ok(out)
}

/// Full query text for a statement, parameters included.
pub fn render(statement: &GraphStatement) -> GraphMindResult<String> {
    Ok(format!("{}{}", parameter_prefix(&statement.parameters)?, statement.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_no_parameters_leaves_text_alone() {
        let statement = GraphStatement::new("MATCH (n) RETURN n LIMIT 1");
        assert_eq!(render(&statement).unwrap(), "MATCH (n) RETURN n LIMIT 1");
    }

    #[test]
    fn test_prefix_renders_literals() {
        let statement = GraphStatement::new("MATCH (n {name: $name}) RETURN n LIMIT $limit")
            .param("name", "Sarah")
            .param("limit", 5);
        assert_eq!(
            render(&statement).unwrap(),
            "CYPHER limit=5 name=\"Sarah\" MATCH (n {name: $name}) RETURN n LIMIT $limit"
        );
    }

    #[test]
    fn test_strings_cannot_escape_their_quotes() {
        let hostile = "x\" MATCH (n) DETACH DELETE n //";
        let encoded = encode_value(&json!(hostile));
        assert_eq!(encoded, "\"x\\\" MATCH (n) DETACH DELETE n //\"");
        assert_eq!(encode_value(&json!("a\\b\nc")), "\"a\\\\b\\nc\"");
    }

    #[test]
    fn test_nested_values() {
        let value = json!({"role": "lead", "odd key": [1, 2.5, null, true]});
        assert_eq!(
            encode_value(&value),
            "{`odd key`: [1, 2.5, null, true], role: \"lead\"}"
        );
    }

    #[test]
    fn test_bad_parameter_name_rejected() {
        let mut params = Map::new();
        params.insert("x=1 MATCH".into(), json!(1));
        assert!(parameter_prefix(&params).is_err());
    }
}
