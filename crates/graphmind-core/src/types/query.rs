//! Query-side data model: template tags, relationship mappings, generated
//! statements and validation categories.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The route a question takes through the pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateTag {
    /// "Who is Sarah?", "Tell me about GraphMind".
    EntityLookup,
    /// One hop from a known entity along a mapped relationship.
    RelationshipQuery,
    /// Nodes touched within a time window.
    TemporalQuery,
    /// Scalar count of a label.
    CountQuery,
    /// All nodes of a label.
    ListQuery,
    /// No template fits; the statement comes from the model.
    LlmGenerate,
}

impl TemplateTag {
    /// Whether the template needs a resolved anchor entity.
    pub fn requires_entity(&self) -> bool {
        matches!(self, Self::EntityLookup | Self::RelationshipQuery)
    }

    /// Whether this tag is served by a deterministic template.
    pub fn is_template(&self) -> bool {
        !matches!(self, Self::LlmGenerate)
    }
}

/// Which way a relationship points, from one endpoint's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
    /// Both ends are the node itself.
    Loop,
}

/// Phrase to relationship mapping used by the extractor, the classifier and
/// the relationship template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMapping {
    /// Surface phrase, lowercase ("worked on").
    pub phrase: String,
    /// Graph relationship type ("WORKS_ON").
    pub relation_type: String,
    /// Hop direction used when the anchor's type is unknown.
    #[serde(default = "default_direction")]
    pub direction: Direction,
    /// Label of the relationship's source node, if constrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    /// Label of the relationship's target node, if constrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_type: Option<String>,
}

fn default_direction() -> Direction {
    Direction::Outgoing
}

impl RelationshipMapping {
    /// Create a mapping between two typed endpoints.
    pub fn new(
        phrase: impl Into<String>,
        relation_type: impl Into<String>,
        source_type: Option<&str>,
        target_type: Option<&str>,
    ) -> Self {
        Self {
            phrase: phrase.into().to_lowercase(),
            relation_type: relation_type.into(),
            direction: Direction::Outgoing,
            source_type: source_type.map(str::to_string),
            target_type: target_type.map(str::to_string),
        }
    }
}

/// Time phrase and the look-back window it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub phrase: String,
    pub days: u32,
}

impl TimePeriod {
    pub fn new(phrase: impl Into<String>, days: u32) -> Self {
        Self {
            phrase: phrase.into().to_lowercase(),
            days,
        }
    }
}

/// A parameterized statement ready for validation or execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    /// Statement text. Literal values never appear here.
    pub statement: String,
    /// Named parameter values.
    #[serde(default)]
    pub parameters: Map<String, Value>,
    /// Route that produced the statement.
    pub template_used: TemplateTag,
    /// Graph namespace the statement targets.
    #[serde(default)]
    pub namespace: String,
}

impl GeneratedQuery {
    pub fn new(statement: impl Into<String>, template_used: TemplateTag) -> Self {
        Self {
            statement: statement.into(),
            parameters: Map::new(),
            template_used,
            namespace: String::new(),
        }
    }

    /// Bind a named parameter.
    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Set the target namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

/// Why a statement was refused by the validator.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationCategory {
    InvalidQuery,
    DestructiveOperation,
    MissingLimit,
    LimitExceeded,
    InvalidSyntax,
    MultiStatement,
}

impl ValidationCategory {
    /// Failures the sanitizer can repair on its own.
    pub fn is_fixable(&self) -> bool {
        matches!(self, Self::MissingLimit)
    }

    /// Failures that must never be retried with the same statement.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::DestructiveOperation | Self::MultiStatement)
    }
}
