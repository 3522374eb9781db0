//! Query vocabulary: the static tables the extractor, classifier, templates
//! and prompt share.
//!
//! A vocabulary is plain data. The default set covers a personal knowledge
//! graph (people, projects, meetings, technologies); tenants with a different
//! schema load their own from configuration.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use graphmind_core::config::GraphMindConfig;
use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::types::{RelationshipMapping, TimePeriod};

/// "last 3 days", "past 2 weeks", "last 6 months".
static RELATIVE_PERIOD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:last|past|previous)\s+(\d{1,4})\s+(day|week|month|year)s?\b").unwrap()
});

/// A noun that names a node label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelKeyword {
    pub keyword: String,
    pub label: String,
}

impl LabelKeyword {
    pub fn new(keyword: &str, label: &str) -> Self {
        Self {
            keyword: keyword.to_lowercase(),
            label: label.to_string(),
        }
    }
}

/// A phrase located in a question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhraseMatch<'a> {
    pub start: usize,
    pub end: usize,
    pub mapping: &'a RelationshipMapping,
}

/// Tables driving deterministic question handling.
///
/// Deserialized vocabularies are normalized, so phrases and keywords may be
/// written in any case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VocabularyFile")]
pub struct QueryVocabulary {
    pub relationships: Vec<RelationshipMapping>,
    pub time_periods: Vec<TimePeriod>,
    /// Window used when a temporal question names no known period.
    pub default_days: u32,
    pub stop_words: Vec<String>,
    pub label_keywords: Vec<LabelKeyword>,
    /// Properties a list or count question may filter on.
    pub filter_properties: Vec<String>,
}

/// On-disk form of a [`QueryVocabulary`]; omitted tables keep their defaults.
#[derive(Deserialize)]
#[serde(default)]
struct VocabularyFile {
    relationships: Vec<RelationshipMapping>,
    time_periods: Vec<TimePeriod>,
    default_days: u32,
    stop_words: Vec<String>,
    label_keywords: Vec<LabelKeyword>,
    filter_properties: Vec<String>,
}

impl Default for VocabularyFile {
    fn default() -> Self {
        let defaults = QueryVocabulary::default();
        Self {
            relationships: defaults.relationships,
            time_periods: defaults.time_periods,
            default_days: defaults.default_days,
            stop_words: defaults.stop_words,
            label_keywords: defaults.label_keywords,
            filter_properties: defaults.filter_properties,
        }
    }
}

impl From<VocabularyFile> for QueryVocabulary {
    fn from(file: VocabularyFile) -> Self {
        Self {
            relationships: file.relationships,
            time_periods: file.time_periods,
            default_days: file.default_days,
            stop_words: file.stop_words,
            label_keywords: file.label_keywords,
            filter_properties: file.filter_properties,
        }
        .normalized()
    }
}

fn normalize_phrase(phrase: &str) -> String {
    phrase.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}

fn rel(phrases: &[&str], rel_type: &str, source: Option<&str>, target: Option<&str>) -> Vec<RelationshipMapping> {
    phrases
        .iter()
        .map(|p| RelationshipMapping::new(*p, rel_type, source, target))
        .collect()
}

impl Default for QueryVocabulary {
    fn default() -> Self {
        let person = Some("Person");
        let relationships = [
            rel(&["work on", "works on", "worked on", "working on"], "WORKS_ON", person, Some("Project")),
            rel(&["work at", "works at", "worked at", "working at", "work for", "works for"], "WORKS_AT", person, Some("Organization")),
            rel(&["know", "knows", "knew"], "KNOWS", person, person),
            rel(&["manage", "manages", "managed", "managing"], "MANAGES", person, None),
            rel(&["lead", "leads", "led", "leading"], "LEADS", person, Some("Project")),
            rel(&["use", "uses", "used", "using"], "USES", Some("Project"), Some("Technology")),
            rel(&["attend", "attends", "attended"], "ATTENDED", person, Some("Meeting")),
            rel(&["wrote", "write", "writes", "authored"], "AUTHORED", person, Some("Document")),
            rel(&["discussed", "discuss", "talked about"], "DISCUSSED", Some("Meeting"), Some("Topic")),
            rel(&["depends on", "depend on", "depended on"], "DEPENDS_ON", Some("Project"), Some("Project")),
            rel(&["assigned to"], "ASSIGNED_TO", Some("Task"), person),
        ]
        .concat();

        let time_periods = [
            ("today", 1),
            ("yesterday", 1),
            ("this week", 7),
            ("last week", 7),
            ("past week", 7),
            ("recently", 7),
            ("lately", 7),
            ("this month", 30),
            ("last month", 30),
            ("past month", 30),
            ("this quarter", 90),
            ("last quarter", 90),
            ("this year", 365),
            ("last year", 365),
        ]
        .iter()
        .map(|(p, d)| TimePeriod::new(*p, *d))
        .collect();

        let stop_words = [
            "a", "about", "all", "an", "and", "any", "are", "at", "by", "can", "could", "count",
            "did", "do", "does", "done", "every", "find", "for", "from", "get", "give", "had",
            "has", "have", "how", "i", "in", "is", "it", "list", "many", "me", "my", "of", "on",
            "or", "our", "show", "tell", "that", "the", "their", "them", "there", "these", "they",
            "this", "those", "to", "was", "we", "were", "what", "when", "where", "which", "who",
            "whom", "whose", "why", "with", "you", "your", "people", "person", "persons",
            "project", "projects", "meeting", "meetings", "technology", "technologies", "tech",
            "document", "documents", "docs", "topic", "topics", "organization", "organizations",
            "company", "companies", "task", "tasks", "event", "events", "tools", "tool", "last",
            "week", "month", "year", "today", "yesterday", "recently",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let label_keywords = [
            ("person", "Person"),
            ("people", "Person"),
            ("persons", "Person"),
            ("colleagues", "Person"),
            ("contacts", "Person"),
            ("project", "Project"),
            ("projects", "Project"),
            ("meeting", "Meeting"),
            ("meetings", "Meeting"),
            ("technology", "Technology"),
            ("technologies", "Technology"),
            ("tools", "Technology"),
            ("document", "Document"),
            ("documents", "Document"),
            ("docs", "Document"),
            ("topic", "Topic"),
            ("topics", "Topic"),
            ("organization", "Organization"),
            ("organizations", "Organization"),
            ("company", "Organization"),
            ("companies", "Organization"),
            ("task", "Task"),
            ("tasks", "Task"),
            ("event", "Event"),
            ("events", "Event"),
        ]
        .iter()
        .map(|(k, l)| LabelKeyword::new(k, l))
        .collect();

        let filter_properties = ["status", "role", "type", "priority", "location", "team", "year", "category"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        Self {
            relationships,
            time_periods,
            default_days: 7,
            stop_words,
            label_keywords,
            filter_properties,
        }
    }
}

/// Occurrences of `phrase` in `haystack` bounded by non-word characters.
/// Both arguments must already be ASCII-lowercased.
fn find_word_bounded(haystack: &str, phrase: &str) -> Vec<usize> {
    let bytes = haystack.as_bytes();
    let is_word = |b: u8| b.is_ascii_alphanumeric() || b == b'_' || b == b'\'';
    haystack
        .match_indices(phrase)
        .map(|(i, _)| i)
        .filter(|&i| {
            let end = i + phrase.len();
            (i == 0 || !is_word(bytes[i - 1])) && (end == bytes.len() || !is_word(bytes[end]))
        })
        .collect()
}

impl QueryVocabulary {
    /// Load a vocabulary file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> GraphMindResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GraphMindError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GraphMindError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GraphMindError::Configuration(e.to_string())),
            _ => Err(GraphMindError::Configuration(
                "Unsupported vocabulary file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// The vocabulary named by `config.vocabulary_path`, or the built-in one.
    pub fn from_config(config: &GraphMindConfig) -> GraphMindResult<Self> {
        match &config.vocabulary_path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Lowercase and collapse whitespace in every phrase, keyword and stop
    /// word, dropping entries left empty.
    pub fn normalized(mut self) -> Self {
        for mapping in &mut self.relationships {
            mapping.phrase = normalize_phrase(&mapping.phrase);
        }
        self.relationships.retain(|m| !m.phrase.is_empty());
        for period in &mut self.time_periods {
            period.phrase = normalize_phrase(&period.phrase);
        }
        self.time_periods.retain(|p| !p.phrase.is_empty());
        for keyword in &mut self.label_keywords {
            keyword.keyword = normalize_phrase(&keyword.keyword);
        }
        self.label_keywords.retain(|k| !k.keyword.is_empty());
        self.stop_words = self
            .stop_words
            .iter()
            .map(|w| w.trim().to_ascii_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    /// Relationship mappings, longest phrase first.
    pub fn phrases_longest_first(&self) -> Vec<&RelationshipMapping> {
        let mut mappings: Vec<&RelationshipMapping> = self.relationships.iter().collect();
        mappings.sort_by(|a, b| b.phrase.len().cmp(&a.phrase.len()));
        mappings
    }

    /// The first relationship phrase found in `question` when phrases are
    /// tried longest-first.
    pub fn first_relationship_phrase(&self, question: &str) -> Option<PhraseMatch<'_>> {
        let lowered = question.to_ascii_lowercase();
        self.phrases_longest_first().into_iter().find_map(|mapping| {
            find_word_bounded(&lowered, &mapping.phrase)
                .first()
                .map(|&start| PhraseMatch {
                    start,
                    end: start + mapping.phrase.len(),
                    mapping,
                })
        })
    }

    /// All non-overlapping relationship phrases in `question`, claimed
    /// longest-first and returned in text order.
    pub fn relationship_phrases(&self, question: &str) -> Vec<PhraseMatch<'_>> {
        let lowered = question.to_ascii_lowercase();
        let mut claimed: Vec<PhraseMatch<'_>> = Vec::new();
        for mapping in self.phrases_longest_first() {
            for start in find_word_bounded(&lowered, &mapping.phrase) {
                let end = start + mapping.phrase.len();
                if claimed.iter().all(|m| end <= m.start || start >= m.end) {
                    claimed.push(PhraseMatch {
                        start,
                        end,
                        mapping,
                    });
                }
            }
        }
        claimed.sort_by_key(|m| m.start);
        claimed
    }

    /// Look-back window named in `question`, if any.
    pub fn time_window(&self, question: &str) -> Option<u32> {
        if let Some(caps) = RELATIVE_PERIOD.captures(question) {
            let n: u32 = caps[1].parse().ok()?;
            let unit = match caps[2].to_ascii_lowercase().as_str() {
                "day" => 1,
                "week" => 7,
                "month" => 30,
                _ => 365,
            };
            return Some(n.saturating_mul(unit));
        }

        let lowered = question.to_ascii_lowercase();
        self.time_periods
            .iter()
            .filter(|p| !find_word_bounded(&lowered, &p.phrase).is_empty())
            .max_by_key(|p| p.phrase.len())
            .map(|p| p.days)
    }

    pub fn mentions_time_period(&self, question: &str) -> bool {
        self.time_window(question).is_some()
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.iter().any(|s| s.eq_ignore_ascii_case(word))
    }

    /// Label named by the first label noun in `question`.
    pub fn infer_label(&self, question: &str) -> Option<&str> {
        let lowered = question.to_ascii_lowercase();
        self.label_keywords
            .iter()
            .filter_map(|k| {
                find_word_bounded(&lowered, &k.keyword)
                    .first()
                    .map(|&pos| (pos, k.label.as_str()))
            })
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, label)| label)
    }

    /// Every label the vocabulary knows, deduplicated, in first-seen order.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        let declared = self
            .label_keywords
            .iter()
            .map(|k| k.label.as_str())
            .chain(self.relationships.iter().flat_map(|r| {
                r.source_type.as_deref().into_iter().chain(r.target_type.as_deref())
            }));
        for label in declared {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }
        labels
    }

    pub fn is_known_label(&self, label: &str) -> bool {
        self.labels().contains(&label)
    }

    /// Every relationship type, deduplicated, in first-seen order.
    pub fn relationship_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for mapping in &self.relationships {
            if !types.contains(&mapping.relation_type.as_str()) {
                types.push(&mapping.relation_type);
            }
        }
        types
    }

    pub fn is_known_relationship(&self, rel_type: &str) -> bool {
        self.relationships.iter().any(|r| r.relation_type == rel_type)
    }

    pub fn is_filter_property(&self, property: &str) -> bool {
        self.filter_properties.iter().any(|p| p.eq_ignore_ascii_case(property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_phrase_wins() {
        let vocab = QueryVocabulary::default();
        let m = vocab.first_relationship_phrase("Which projects depend on GraphMind?").unwrap();
        assert_eq!(m.mapping.relation_type, "DEPENDS_ON");
        let m = vocab.first_relationship_phrase("What did Sarah work on?").unwrap();
        assert_eq!(m.mapping.phrase, "work on");
    }

    #[test]
    fn test_phrases_respect_word_boundaries() {
        let vocab = QueryVocabulary::default();
        // "knowledge" must not match "know", "useful" must not match "use"
        assert!(vocab.first_relationship_phrase("Show my knowledge base").is_none());
        assert!(vocab.first_relationship_phrase("Anything useful?").is_none());
    }

    #[test]
    fn test_non_overlapping_phrases() {
        let vocab = QueryVocabulary::default();
        let found = vocab.relationship_phrases("Find people who know about Python and attended meetings last month");
        let types: Vec<&str> = found.iter().map(|m| m.mapping.relation_type.as_str()).collect();
        assert_eq!(types, vec!["KNOWS", "ATTENDED"]);

        // "works on" claims its span; "work" alone is not a phrase
        assert_eq!(vocab.relationship_phrases("Who works on GraphMind").len(), 1);
    }

    #[test]
    fn test_time_window() {
        let vocab = QueryVocabulary::default();
        assert_eq!(vocab.time_window("What did I do last week?"), Some(7));
        assert_eq!(vocab.time_window("meetings last month"), Some(30));
        assert_eq!(vocab.time_window("what happened in the last 3 days"), Some(3));
        assert_eq!(vocab.time_window("past 2 weeks"), Some(14));
        assert_eq!(vocab.time_window("List all projects"), None);
    }

    #[test]
    fn test_infer_label_uses_first_noun() {
        let vocab = QueryVocabulary::default();
        assert_eq!(vocab.infer_label("List all projects"), Some("Project"));
        assert_eq!(vocab.infer_label("people in meetings"), Some("Person"));
        assert_eq!(vocab.infer_label("everything"), None);
    }

    #[test]
    fn test_labels_and_types() {
        let vocab = QueryVocabulary::default();
        assert!(vocab.is_known_label("Person"));
        assert!(vocab.is_known_label("Topic"));
        assert!(!vocab.is_known_label("Secret"));
        assert!(vocab.relationship_types().contains(&"WORKS_ON"));
        assert_eq!(
            vocab.relationship_types().len(),
            vocab.relationship_types().iter().collect::<std::collections::HashSet<_>>().len()
        );
    }

    #[test]
    fn test_loads_partial_override() {
        let vocab: QueryVocabulary = serde_json::from_value(serde_json::json!({
            "relationships": [{"phrase": "mentors", "relation_type": "MENTORS", "source_type": "Person", "target_type": "Person"}],
            "default_days": 14
        }))
        .unwrap();
        assert_eq!(vocab.relationships.len(), 1);
        assert_eq!(vocab.default_days, 14);
        assert!(!vocab.stop_words.is_empty());
    }

    #[test]
    fn test_loaded_entries_are_normalized() {
        let vocab: QueryVocabulary = serde_json::from_value(serde_json::json!({
            "relationships": [
                {"phrase": "Mentors", "relation_type": "MENTORS", "source_type": "Person", "target_type": "Person"},
                {"phrase": "   ", "relation_type": "EMPTY"}
            ],
            "time_periods": [{"phrase": "Last  Sprint", "days": 14}],
            "label_keywords": [{"keyword": "Squads", "label": "Team"}]
        }))
        .unwrap();

        assert_eq!(vocab.relationships.len(), 1);
        let m = vocab.first_relationship_phrase("Who MENTORS Bob?").unwrap();
        assert_eq!(m.mapping.relation_type, "MENTORS");
        assert_eq!(vocab.time_window("What shipped last sprint?"), Some(14));
        assert_eq!(vocab.infer_label("List all squads"), Some("Team"));
    }

    #[test]
    fn test_from_file_and_config() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "relationships:\n  - phrase: Reports To\n    relation_type: REPORTS_TO\n    source_type: Person\n    target_type: Person\ndefault_days: 10"
        )
        .unwrap();

        let config = GraphMindConfig {
            vocabulary_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let vocab = QueryVocabulary::from_config(&config).unwrap();
        assert_eq!(vocab.relationships[0].phrase, "reports to");
        assert_eq!(vocab.default_days, 10);

        let builtin = QueryVocabulary::from_config(&GraphMindConfig::default()).unwrap();
        assert_eq!(builtin, QueryVocabulary::default());

        let bad = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(matches!(
            QueryVocabulary::from_file(bad.path()),
            Err(GraphMindError::Configuration(_))
        ));
    }
}
