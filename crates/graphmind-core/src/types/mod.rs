//! Core data types shared across graphmind crates.

mod entity;
mod graph_value;
mod message;
mod query;
mod result;

pub use entity::{entity_key, CanonicalEntity, DuplicateCandidate, MatchKind, ResolvedEntity};
pub use graph_value::{ExecutionStats, GraphNode, GraphRelationship, GraphRows, GraphValue};
pub use message::{Message, MessageRole};
pub use query::{
    Direction, GeneratedQuery, RelationshipMapping, TemplateTag, TimePeriod, ValidationCategory,
};
pub use result::{QueryResult, ResultEntity, ResultMetadata, ResultRelationship, ResultShape};
