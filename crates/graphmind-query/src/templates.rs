//! Deterministic statement templates, one per recognized question shape.
//!
//! Literal values only ever travel as named parameters. Labels, relationship
//! types and filter properties are spliced into the text, so they are taken
//! from the vocabulary and checked to be plain identifiers.

use std::sync::Arc;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::types::{
    Direction, GeneratedQuery, RelationshipMapping, ResolvedEntity, TemplateTag,
};
use graphmind_entity::merge::is_safe_identifier;

use crate::vocabulary::QueryVocabulary;

const LOOKUP_LIMIT: u32 = 1;
const RELATIONSHIP_LIMIT: u32 = 100;
const TEMPORAL_LIMIT: u32 = 50;
const LIST_LIMIT: u32 = 100;

/// "... with status active", "... with role = 'lead'".
static FILTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bwith\s+([a-z_][a-z0-9_]*)\s+(?:of\s+|is\s+|=\s*)?['"]?(.+?)['"]?\s*[?.!]*\s*$"#)
        .unwrap()
});

/// An equality filter parsed from a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFilter {
    pub property: String,
    pub value: String,
}

/// Builds template statements.
#[derive(Debug, Clone)]
pub struct TemplateBuilder {
    vocabulary: Arc<QueryVocabulary>,
}

impl TemplateBuilder {
    pub fn new(vocabulary: Arc<QueryVocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Build the statement for `tag`. `entities` are the resolved references
    /// in question order; the first one anchors entity templates.
    pub fn build(
        &self,
        tag: TemplateTag,
        question: &str,
        entities: &[ResolvedEntity],
    ) -> GraphMindResult<GeneratedQuery> {
        self.build_at(tag, question, entities, Utc::now())
    }

    /// [`build`](Self::build) with an explicit clock for temporal windows.
    pub fn build_at(
        &self,
        tag: TemplateTag,
        question: &str,
        entities: &[ResolvedEntity],
        now: DateTime<Utc>,
    ) -> GraphMindResult<GeneratedQuery> {
        match tag {
            TemplateTag::EntityLookup => self.entity_lookup(anchor(entities)?),
            TemplateTag::RelationshipQuery => {
                let found = self
                    .vocabulary
                    .first_relationship_phrase(question)
                    .ok_or_else(|| GraphMindError::validation("No relationship phrase in question"))?;
                self.relationship(anchor(entities)?, found.mapping)
            }
            TemplateTag::TemporalQuery => {
                let days = self
                    .vocabulary
                    .time_window(question)
                    .unwrap_or(self.vocabulary.default_days);
                Ok(self.temporal(self.vocabulary.infer_label(question), days, now))
            }
            TemplateTag::ListQuery => Ok(self.list(
                self.vocabulary.infer_label(question),
                self.parse_filter(question).as_ref(),
            )),
            TemplateTag::CountQuery => Ok(self.count(
                self.vocabulary.infer_label(question),
                self.parse_filter(question).as_ref(),
            )),
            TemplateTag::LlmGenerate => Err(GraphMindError::validation(
                "Question has no template; use the model generator",
            )),
        }
    }

    /// `MATCH (n[:Type] {name: $name}) RETURN n LIMIT 1`
    pub fn entity_lookup(&self, entity: &ResolvedEntity) -> GraphMindResult<GeneratedQuery> {
        let label = self.label_clause(entity.entity_type.as_deref());
        Ok(GeneratedQuery::new(
            format!("MATCH (n{} {{name: $name}}) RETURN n LIMIT {}", label, LOOKUP_LIMIT),
            TemplateTag::EntityLookup,
        )
        .with_param("name", entity.name.clone()))
    }

    /// One hop from the anchor along `mapping`.
    ///
    /// A typed anchor hops incoming when its type is the mapping's target
    /// type and outgoing otherwise. An untyped anchor follows the mapping's
    /// declared direction. The far node is labelled with the opposite role's
    /// type.
    pub fn relationship(
        &self,
        anchor: &ResolvedEntity,
        mapping: &RelationshipMapping,
    ) -> GraphMindResult<GeneratedQuery> {
        if !is_safe_identifier(&mapping.relation_type) {
            return Err(GraphMindError::validation(format!(
                "Relationship type {:?} is not a plain identifier",
                mapping.relation_type
            )));
        }

        let incoming = match anchor.entity_type.as_deref() {
            Some(entity_type) => mapping.target_type.as_deref() == Some(entity_type),
            None => mapping.direction == Direction::Incoming,
        };
        let (arrow_in, arrow_out, other_type) = if incoming {
            ("<-", "-", mapping.source_type.as_deref())
        } else {
            ("-", "->", mapping.target_type.as_deref())
        };

        let statement = format!(
            "MATCH (a{} {{name: $name}}){}[r:{}]{}(b{}) RETURN a, r, b LIMIT {}",
            self.label_clause(anchor.entity_type.as_deref()),
            arrow_in,
            mapping.relation_type,
            arrow_out,
            self.label_clause(other_type),
            RELATIONSHIP_LIMIT
        );

        Ok(GeneratedQuery::new(statement, TemplateTag::RelationshipQuery)
            .with_param("name", anchor.name.clone()))
    }

    /// Nodes with a `timestamp` inside the last `days` days, newest first.
    pub fn temporal(&self, label: Option<&str>, days: u32, now: DateTime<Utc>) -> GeneratedQuery {
        let since = now - Duration::days(i64::from(days));
        GeneratedQuery::new(
            format!(
                "MATCH (n{}) WHERE n.timestamp >= $since RETURN n ORDER BY n.timestamp DESC LIMIT {}",
                self.label_clause(label),
                TEMPORAL_LIMIT
            ),
            TemplateTag::TemporalQuery,
        )
        .with_param("since", since.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Nodes of a label, optionally filtered, ordered by name.
    pub fn list(&self, label: Option<&str>, filter: Option<&PropertyFilter>) -> GeneratedQuery {
        let (condition, value) = filter_clause(filter);
        let query = GeneratedQuery::new(
            format!(
                "MATCH (n{}){} RETURN n ORDER BY n.name LIMIT {}",
                self.label_clause(label),
                condition,
                LIST_LIMIT
            ),
            TemplateTag::ListQuery,
        );
        match value {
            Some(v) => query.with_param("value", v),
            None => query,
        }
    }

    /// Scalar count of a label, optionally filtered.
    pub fn count(&self, label: Option<&str>, filter: Option<&PropertyFilter>) -> GeneratedQuery {
        let known = label.filter(|l| self.is_usable_label(l));
        let (condition, value) = filter_clause(filter);
        let query = GeneratedQuery::new(
            format!(
                "MATCH (n{}){} RETURN count(n) AS count, $label AS label LIMIT 1",
                self.label_clause(known),
                condition
            ),
            TemplateTag::CountQuery,
        )
        .with_param("label", known.unwrap_or("all"));
        match value {
            Some(v) => query.with_param("value", v),
            None => query,
        }
    }

    /// Equality filter on a known property, if the question has one.
    pub fn parse_filter(&self, question: &str) -> Option<PropertyFilter> {
        let caps = FILTER.captures(question)?;
        let property = caps[1].to_ascii_lowercase();
        let value = caps[2].trim().to_string();
        if value.is_empty() || !self.vocabulary.is_filter_property(&property) || !is_safe_identifier(&property) {
            return None;
        }
        Some(PropertyFilter { property, value })
    }

    fn is_usable_label(&self, label: &str) -> bool {
        self.vocabulary.is_known_label(label) && is_safe_identifier(label)
    }

    fn label_clause(&self, label: Option<&str>) -> String {
        match label {
            Some(l) if self.is_usable_label(l) => format!(":{}", l),
            _ => String::new(),
        }
    }
}

fn anchor(entities: &[ResolvedEntity]) -> GraphMindResult<&ResolvedEntity> {
    entities
        .first()
        .ok_or_else(|| GraphMindError::validation("Template needs an entity reference"))
}

fn filter_clause(filter: Option<&PropertyFilter>) -> (String, Option<String>) {
    match filter {
        Some(f) => (format!(" WHERE n.{} = $value", f.property), Some(f.value.clone())),
        None => (String::new(), None),
    }
}
