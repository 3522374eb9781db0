//! graphmind-core - Core library for graphmind.
//!
//! This crate provides the shared data model, the traits for external
//! collaborators (graph store, entity directory, cache, model runner), the
//! error hierarchy and configuration used by every other graphmind crate.
//!
//! # Example
//!
//! ```ignore
//! use graphmind_core::{GraphMindConfig, GraphStatement};
//!
//! let config = GraphMindConfig::from_env();
//! let namespace = config.namespace_for("user-42");
//! let statement = GraphStatement::new("MATCH (n {name: $name}) RETURN n LIMIT 1")
//!     .param("name", "Sarah");
//! let rows = store.execute_read_only(&namespace, &statement).await?;
//! ```

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{
    user_namespace, GeneratorConfig, GraphMindConfig, MergeConfig, MergeStrategy,
    ResolverConfig, TierConfig, ValidatorConfig,
};
pub use error::{ErrorCode, GraphMindError, GraphMindResult, QUERY_GENERATION_USER_MESSAGE};
pub use traits::{
    Cache, EntityDirectory, GraphStatement, GraphStore, GraphStoreConfig, GraphStoreProvider,
    LlmConfig, LlmProvider, ModelRequest, ModelRunner,
};
pub use types::{
    entity_key, CanonicalEntity, Direction, DuplicateCandidate, ExecutionStats, GeneratedQuery,
    GraphNode, GraphRelationship, GraphRows, GraphValue, MatchKind, Message, MessageRole,
    QueryResult, RelationshipMapping, ResolvedEntity, ResultEntity, ResultMetadata,
    ResultRelationship, ResultShape, TemplateTag, TimePeriod, ValidationCategory,
};
