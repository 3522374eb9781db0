//! Candidate entity references from question text.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::vocabulary::QueryVocabulary;

/// A piece of question text that may name an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    pub text: String,
}

impl EntityReference {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Extracts entity references from questions.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    vocabulary: Arc<QueryVocabulary>,
}

impl EntityExtractor {
    pub fn new(vocabulary: Arc<QueryVocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Extract references from `question`.
    ///
    /// If a relationship phrase is present the question is split around the
    /// first one (longest phrases tried first) and each side, stripped of
    /// stop words, becomes a reference. Otherwise every capitalized word that
    /// is not a stop word is a reference. An empty result is valid.
    pub fn extract(&self, question: &str) -> Vec<EntityReference> {
        let candidates = match self.vocabulary.first_relationship_phrase(question) {
            Some(found) => {
                let before = &question[..found.start];
                let after = &question[found.end..];
                [before, after]
                    .iter()
                    .filter_map(|side| self.strip_side(side))
                    .collect()
            }
            None => self.capitalized_words(question),
        };

        let mut refs: Vec<EntityReference> = Vec::new();
        for text in candidates {
            if !refs.iter().any(|r| r.text.eq_ignore_ascii_case(&text)) {
                refs.push(EntityReference::new(text));
            }
        }
        refs
    }

    /// Drop stop words from both ends of one side of a split question.
    fn strip_side(&self, side: &str) -> Option<String> {
        let words: Vec<&str> = side
            .split_whitespace()
            .map(trim_punctuation)
            .filter(|w| !w.is_empty())
            .collect();

        let start = words.iter().position(|w| !self.vocabulary.is_stop_word(w))?;
        let end = words.iter().rposition(|w| !self.vocabulary.is_stop_word(w))?;
        let text = words[start..=end].join(" ");

        (text.chars().count() > 1).then_some(text)
    }

    fn capitalized_words(&self, question: &str) -> Vec<String> {
        question
            .split_whitespace()
            .map(trim_punctuation)
            .filter(|w| w.chars().count() > 1)
            .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
            .filter(|w| !self.vocabulary.is_stop_word(w))
            .map(str::to_string)
            .collect()
    }
}
