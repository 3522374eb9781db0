//! Canonical entity records kept in the per-user directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Derive the lookup key for a canonical name.
///
/// Lowercases, folds every run of non-alphanumeric characters into a single
/// `_`, and trims leading/trailing separators. `"Dr. John Smith"` becomes
/// `"dr_john_smith"`.
pub fn entity_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(c.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    key
}

/// Authoritative record a textual mention resolves to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub user_id: String,
    pub entity_key: String,
    pub canonical_name: String,
    pub entity_type: String,
    /// Always contains `canonical_name`.
    pub aliases: Vec<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    pub mention_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_mentioned_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_mentioned_id: Option<String>,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CanonicalEntity {
    /// Create a record for a first mention.
    pub fn new(
        user_id: impl Into<String>,
        canonical_name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        let canonical_name = canonical_name.into();
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            entity_key: entity_key(&canonical_name),
            aliases: vec![canonical_name.clone()],
            canonical_name,
            entity_type: entity_type.into(),
            properties: Map::new(),
            mention_count: 1,
            first_mentioned_id: None,
            last_mentioned_id: None,
            confidence: 1.0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the mention that introduced this entity.
    pub fn with_first_mention(mut self, mention_id: impl Into<String>) -> Self {
        let id = mention_id.into();
        self.first_mentioned_id = Some(id.clone());
        self.last_mentioned_id = Some(id);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for alias in aliases {
            self.add_alias(alias.into());
        }
        self
    }

    /// Add an alias unless an equal one (case-insensitive) is already present.
    /// Returns true if the alias was new.
    pub fn add_alias(&mut self, alias: impl Into<String>) -> bool {
        let alias = alias.into();
        let alias = alias.trim();
        if alias.is_empty() || self.has_name(alias) {
            return false;
        }
        self.aliases.push(alias.to_string());
        true
    }

    /// Case-insensitive match against the canonical name and every alias.
    pub fn has_name(&self, name: &str) -> bool {
        self.canonical_name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Count one more mention. The count never decreases.
    pub fn record_mention(&mut self, mention_id: Option<&str>) {
        self.mention_count = self.mention_count.saturating_add(1);
        if let Some(id) = mention_id {
            if self.first_mentioned_id.is_none() {
                self.first_mentioned_id = Some(id.to_string());
            }
            self.last_mentioned_id = Some(id.to_string());
        }
        self.updated_at = Utc::now();
    }

    /// Restore the alias invariant after deserialization from an external store.
    pub fn ensure_canonical_alias(&mut self) {
        if !self.aliases.iter().any(|a| a == &self.canonical_name) {
            self.aliases.insert(0, self.canonical_name.clone());
        }
    }
}

/// How a reference was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Fuzzy,
    Cached,
    Unresolved,
}

/// Outcome of resolving a single reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    /// Canonical name, or the literal reference when unresolved.
    pub name: String,
    /// Entity type, `None` when unresolved.
    pub entity_type: Option<String>,
    pub entity_key: Option<String>,
    pub match_kind: MatchKind,
}

impl ResolvedEntity {
    /// Literal pass-through for references with no directory match.
    pub fn unresolved(text: impl Into<String>) -> Self {
        Self {
            name: text.into(),
            entity_type: None,
            entity_key: None,
            match_kind: MatchKind::Unresolved,
        }
    }

    pub fn from_entity(entity: &CanonicalEntity, match_kind: MatchKind) -> Self {
        Self {
            name: entity.canonical_name.clone(),
            entity_type: Some(entity.entity_type.clone()),
            entity_key: Some(entity.entity_key.clone()),
            match_kind,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.match_kind != MatchKind::Unresolved
    }
}

/// A likely duplicate of some canonical entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCandidate {
    pub entity_key: String,
    pub name: String,
    pub entity_type: String,
    pub similarity_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_normalization() {
        assert_eq!(entity_key("Dr. John Smith"), "dr_john_smith");
        assert_eq!(entity_key("  GraphMind  "), "graphmind");
        assert_eq!(entity_key("C++ / Rust"), "c_rust");
        assert_eq!(entity_key("--"), "");
    }

    #[test]
    fn test_new_entity_has_canonical_alias() {
        let e = CanonicalEntity::new("u1", "Sarah Connor", "Person");
        assert_eq!(e.aliases, vec!["Sarah Connor".to_string()]);
        assert_eq!(e.entity_key, "sarah_connor");
        assert_eq!(e.mention_count, 1);
    }

    #[test]
    fn test_add_alias_dedups_case_insensitive() {
        let mut e = CanonicalEntity::new("u1", "Sarah", "Person");
        assert!(!e.add_alias("sarah"));
        assert!(e.add_alias("Sara"));
        assert!(!e.add_alias("SARA"));
        assert_eq!(e.aliases.len(), 2);
        assert!(e.has_name("sara"));
    }

    #[test]
    fn test_record_mention_monotonic() {
        let mut e = CanonicalEntity::new("u1", "Sarah", "Person").with_first_mention("m1");
        e.record_mention(Some("m2"));
        e.record_mention(None);
        assert_eq!(e.mention_count, 3);
        assert_eq!(e.first_mentioned_id.as_deref(), Some("m1"));
        assert_eq!(e.last_mentioned_id.as_deref(), Some("m2"));
    }

    #[test]
    fn test_ensure_canonical_alias() {
        let mut e = CanonicalEntity::new("u1", "Sarah", "Person");
        e.aliases.clear();
        e.ensure_canonical_alias();
        assert_eq!(e.aliases, vec!["Sarah".to_string()]);
    }
}
