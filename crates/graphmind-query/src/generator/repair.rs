//! Cleanup of raw model output into a single candidate statement.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```").unwrap());

static THINKING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").unwrap());

static LABEL_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:cypher|opencypher|query|answer)\s*:\s*").unwrap());

static NAMESPACE_SELECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*USE\s+[A-Za-z_][A-Za-z0-9_.\-]*\s*;?\s*").unwrap());

/// Reduce raw model output to its first statement.
///
/// Strips reasoning tags and code fences, a leading `Cypher:`/`Query:`
/// label and a leading `USE <graph>` selection, then cuts at the first
/// terminator outside quoted text. Returns `None` if nothing is left.
pub fn repair_output(raw: &str) -> Option<String> {
    let without_thinking = THINKING.replace_all(raw, "");
    let mut text: &str = without_thinking.trim();

    let fenced;
    if let Some(caps) = CODE_FENCE.captures(text) {
        fenced = caps.get(1).map_or("", |m| m.as_str()).to_string();
        text = fenced.trim();
    }

    let unlabelled = LABEL_PREFIX.replace(text, "");
    let selected = NAMESPACE_SELECTION.replace(&unlabelled, "");
    let statement = lexer::first_statement(&selected).trim();

    (!statement.is_empty()).then(|| statement.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_statement_untouched() {
        assert_eq!(
            repair_output("MATCH (n) RETURN n LIMIT 5").as_deref(),
            Some("MATCH (n) RETURN n LIMIT 5")
        );
    }

    #[test]
    fn test_strips_fences_and_labels() {
        let raw = "Here you go:\n```cypher\nCypher: MATCH (n:Person) RETURN n LIMIT 5\n```\nHope it helps";
        assert_eq!(repair_output(raw).as_deref(), Some("MATCH (n:Person) RETURN n LIMIT 5"));
    }

    #[test]
    fn test_strips_namespace_selection() {
        assert_eq!(
            repair_output("USE graphmind_other; MATCH (n) RETURN n LIMIT 5").as_deref(),
            Some("MATCH (n) RETURN n LIMIT 5")
        );
        assert_eq!(
            repair_output("Query: USE g1 MATCH (n) RETURN n").as_deref(),
            Some("MATCH (n) RETURN n")
        );
    }

    #[test]
    fn test_truncates_to_first_statement() {
        let raw = "MATCH (n {name: 'a;b'}) RETURN n LIMIT 1; MATCH (m) DETACH DELETE m";
        assert_eq!(repair_output(raw).as_deref(), Some("MATCH (n {name: 'a;b'}) RETURN n LIMIT 1"));
    }

    #[test]
    fn test_drops_reasoning() {
        let raw = "<think>The user wants; people</think>MATCH (p:Person) RETURN p LIMIT 3";
        assert_eq!(repair_output(raw).as_deref(), Some("MATCH (p:Person) RETURN p LIMIT 3"));
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(repair_output("   "), None);
        assert_eq!(repair_output("```\n```"), None);
        assert_eq!(repair_output(";"), None);
    }
}
