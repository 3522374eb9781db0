//! Prompt for model-generated statements.

use graphmind_core::types::Message;

use crate::vocabulary::QueryVocabulary;

/// Few-shot pairs shown to the model.
const EXAMPLES: &[(&str, &str)] = &[
    (
        "Who does Sarah work with on GraphMind?",
        "MATCH (s:Person {name: 'Sarah'})-[:WORKS_ON]->(p:Project {name: 'GraphMind'})<-[:WORKS_ON]-(o:Person) WHERE o <> s RETURN DISTINCT o LIMIT 25",
    ),
    (
        "Which technologies do Sarah's projects use?",
        "MATCH (:Person {name: 'Sarah'})-[:WORKS_ON]->(p:Project)-[:USES]->(t:Technology) RETURN DISTINCT t LIMIT 25",
    ),
    (
        "Which of Sarah's contacts attended meetings about the roadmap?",
        "MATCH (:Person {name: 'Sarah'})-[:KNOWS]->(p:Person)-[:ATTENDED]->(m:Meeting)-[:DISCUSSED]->(:Topic {name: 'Roadmap'}) RETURN DISTINCT p, m LIMIT 25",
    ),
];

/// System instructions listing the allowed schema and the rules.
pub fn system_prompt(vocabulary: &QueryVocabulary) -> String {
    let labels = vocabulary.labels().join(", ");
    let relationships = vocabulary.relationship_types().join(", ");
    let examples = EXAMPLES
        .iter()
        .map(|(q, s)| format!("Question: {}\nQuery: {}", q, s))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You translate questions about a personal knowledge graph into a single read-only openCypher query.

NODE LABELS: {labels}

RELATIONSHIP TYPES: {relationships}

Every node has a `name` property. Time-stamped nodes have a `timestamp` property holding an ISO-8601 string.

Rules:
1. Use only the labels and relationship types listed above
2. Read only: never use CREATE, MERGE, DELETE, DETACH, SET, REMOVE, DROP, LOAD CSV or FOREACH
3. Write exactly one statement and end it with LIMIT 100 or less
4. Do not select a graph with USE
5. Return nodes and relationships rather than individual properties where possible

Examples:

{examples}

Return ONLY the query, no explanation and no code fences."#
    )
}

/// Messages for one generation attempt.
pub fn messages(vocabulary: &QueryVocabulary, question: &str) -> Vec<Message> {
    vec![
        Message::system(system_prompt(vocabulary)),
        Message::user(format!("Question: {}\nQuery:", question.trim())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::find_destructive_keyword;
    use regex::Regex;

    #[test]
    fn test_prompt_lists_vocabulary() {
        let prompt = system_prompt(&QueryVocabulary::default());
        assert!(prompt.contains("Person"));
        assert!(prompt.contains("WORKS_ON"));
        assert!(prompt.contains("LIMIT 100"));
    }

    #[test]
    fn test_examples_are_safe() {
        for (_, statement) in EXAMPLES {
            assert!(find_destructive_keyword(statement).is_none(), "{}", statement);
        }
    }

    #[test]
    fn test_examples_use_known_schema() {
        let vocabulary = QueryVocabulary::default();
        let labels = vocabulary.labels();
        let types = vocabulary.relationship_types();
        let label = Regex::new(r"\(\w*:(\w+)").unwrap();
        let rel_type = Regex::new(r"\[\w*:(\w+)\]").unwrap();
        let date = Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap();

        for (_, statement) in EXAMPLES {
            for caps in label.captures_iter(statement) {
                assert!(labels.contains(&&caps[1]), "{} in {}", &caps[1], statement);
            }
            for caps in rel_type.captures_iter(statement) {
                assert!(types.contains(&&caps[1]), "{} in {}", &caps[1], statement);
            }
            assert!(!date.is_match(statement), "{}", statement);
        }
    }

    #[test]
    fn test_messages_shape() {
        let msgs = messages(&QueryVocabulary::default(), "  Who knows Bob? ");
        assert_eq!(msgs.len(), 2);
        assert!(msgs[1].content.ends_with("Who knows Bob?\nQuery:"));
    }
}
