//! Priority-ordered question classification.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use graphmind_core::types::TemplateTag;

use crate::vocabulary::QueryVocabulary;

static ENTITY_LOOKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(who is|who's|what is|what's|tell me about)\b").unwrap());

static COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(how many|count)\b").unwrap());

static LIST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(list all|show me all|show all|list)\b").unwrap());

/// Maps a question to the route that will answer it.
///
/// Rules are tried in order and the first hit wins:
/// entity lookup, compound relationship (model), single relationship,
/// temporal, count, list, then the model.
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    vocabulary: Arc<QueryVocabulary>,
}

impl PatternClassifier {
    pub fn new(vocabulary: Arc<QueryVocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn classify(&self, question: &str) -> TemplateTag {
        let tag = self.cascade(question);
        debug!(template = %tag, "Classified question");
        tag
    }

    fn cascade(&self, question: &str) -> TemplateTag {
        if ENTITY_LOOKUP.is_match(question) {
            return TemplateTag::EntityLookup;
        }

        let relationship_types: HashSet<&str> = self
            .vocabulary
            .relationship_phrases(question)
            .iter()
            .map(|m| m.mapping.relation_type.as_str())
            .collect();
        match relationship_types.len() {
            0 => {}
            1 => return TemplateTag::RelationshipQuery,
            // Templates cover one hop only.
            _ => return TemplateTag::LlmGenerate,
        }

        if self.vocabulary.mentions_time_period(question) {
            return TemplateTag::TemporalQuery;
        }
        if COUNT.is_match(question) {
            return TemplateTag::CountQuery;
        }
        if LIST.is_match(question) {
            return TemplateTag::ListQuery;
        }
        TemplateTag::LlmGenerate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> TemplateTag {
        PatternClassifier::new(Arc::new(QueryVocabulary::default())).classify(q)
    }

    #[test]
    fn test_reference_questions() {
        assert_eq!(classify("Who is Sarah?"), TemplateTag::EntityLookup);
        assert_eq!(classify("What projects did Sarah work on?"), TemplateTag::RelationshipQuery);
        assert_eq!(classify("What did I do last week?"), TemplateTag::TemporalQuery);
        assert_eq!(classify("List all projects"), TemplateTag::ListQuery);
        assert_eq!(classify("How many projects?"), TemplateTag::CountQuery);
        assert_eq!(
            classify("Find people who know about Python and attended meetings last month"),
            TemplateTag::LlmGenerate
        );
    }

    #[test]
    fn test_relationship_outranks_time_count_and_list() {
        assert_eq!(classify("Who did Sarah work on projects with last week?"), TemplateTag::RelationshipQuery);
        assert_eq!(classify("How many people know Sarah?"), TemplateTag::RelationshipQuery);
        assert_eq!(classify("List everyone who knows Bob"), TemplateTag::RelationshipQuery);
    }

    #[test]
    fn test_same_relationship_twice_is_not_compound() {
        assert_eq!(classify("Who knows Sarah and who knew Bob?"), TemplateTag::RelationshipQuery);
    }

    #[test]
    fn test_tell_me_about() {
        assert_eq!(classify("Tell me about GraphMind"), TemplateTag::EntityLookup);
    }

    #[test]
    fn test_unmatched_goes_to_model() {
        assert_eq!(classify("Which technologies overlap between teams?"), TemplateTag::LlmGenerate);
    }

    #[test]
    fn test_count_and_list_words_need_boundaries() {
        assert_eq!(classify("Show the counterparts"), TemplateTag::LlmGenerate);
        assert_eq!(classify("Count projects"), TemplateTag::CountQuery);
        assert_eq!(classify("Show all meetings"), TemplateTag::ListQuery);
    }

    #[test]
    fn test_loaded_vocabulary_matches_regardless_of_case() {
        let vocab: QueryVocabulary = serde_json::from_value(serde_json::json!({
            "relationships": [{"phrase": "Mentors", "relation_type": "MENTORS", "source_type": "Person", "target_type": "Person"}]
        }))
        .unwrap();
        let classifier = PatternClassifier::new(Arc::new(vocab));
        assert_eq!(classifier.classify("Who mentors Bob?"), TemplateTag::RelationshipQuery);
    }
}
