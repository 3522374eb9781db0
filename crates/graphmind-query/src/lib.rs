//! graphmind-query - From natural-language questions to safe graph statements.
//!
//! Questions are classified by pattern. Deterministic templates answer the
//! common shapes; the rest go to a two-tier model fallback. Every statement,
//! whichever path produced it, passes the same validator before it reaches
//! a store, and results come back through the formatter.
//!
//! # Example
//!
//! ```ignore
//! use graphmind_query::QueryPipeline;
//!
//! let pipeline = QueryPipeline::from_config(&config, vocabulary, directory, runner, None);
//! let query = pipeline.generate("Who is Sarah?", "user-42").await?;
//! assert_eq!(query.statement, "MATCH (n:Person {name: $name}) RETURN n LIMIT 1");
//! ```

pub mod classifier;
pub mod extractor;
pub mod formatter;
pub mod generator;
pub mod lexer;
pub mod pipeline;
pub mod templates;
pub mod validator;
pub mod vocabulary;

pub use classifier::PatternClassifier;
pub use extractor::{EntityExtractor, EntityReference};
pub use formatter::{display_name, format_auto, format_count, format_empty, format_rows};
pub use generator::{
    repair_output, LlmQueryGenerator, QuestionFingerprint, TierFailure, TierOutcome,
};
pub use pipeline::QueryPipeline;
pub use templates::{PropertyFilter, TemplateBuilder};
pub use validator::{
    find_destructive_keyword, QueryValidator, ValidatedQuery, ValidationContext, ValidationError,
    ValidationMode,
};
pub use vocabulary::{LabelKeyword, PhraseMatch, QueryVocabulary};
