//! End-to-end question handling: classify, extract, resolve, build or
//! generate, validate, and optionally execute.

use std::sync::Arc;

use tracing::{debug, warn};

use graphmind_core::config::{user_namespace, GraphMindConfig};
use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::{Cache, EntityDirectory, GraphStatement, GraphStore, ModelRunner};
use graphmind_core::types::{GeneratedQuery, QueryResult, TemplateTag};
use graphmind_entity::EntityResolver;

use crate::classifier::PatternClassifier;
use crate::extractor::EntityExtractor;
use crate::formatter::format_auto;
use crate::generator::LlmQueryGenerator;
use crate::templates::TemplateBuilder;
use crate::validator::{QueryValidator, ValidationMode};
use crate::vocabulary::QueryVocabulary;

const DEFAULT_NAMESPACE_PREFIX: &str = "graphmind_";

/// Turns a user's question into a validated statement scoped to their graph.
pub struct QueryPipeline {
    extractor: EntityExtractor,
    classifier: PatternClassifier,
    builder: TemplateBuilder,
    resolver: EntityResolver,
    validator: QueryValidator,
    generator: LlmQueryGenerator,
    namespace_prefix: String,
}

impl QueryPipeline {
    pub fn new(
        vocabulary: Arc<QueryVocabulary>,
        resolver: EntityResolver,
        generator: LlmQueryGenerator,
        validator: QueryValidator,
    ) -> Self {
        Self {
            extractor: EntityExtractor::new(vocabulary.clone()),
            classifier: PatternClassifier::new(vocabulary.clone()),
            builder: TemplateBuilder::new(vocabulary),
            resolver,
            validator,
            generator,
            namespace_prefix: DEFAULT_NAMESPACE_PREFIX.to_string(),
        }
    }

    /// Assemble every component from configuration.
    pub fn from_config(
        config: &GraphMindConfig,
        vocabulary: Arc<QueryVocabulary>,
        directory: Arc<dyn EntityDirectory>,
        runner: Arc<dyn ModelRunner>,
        cache: Option<Arc<dyn Cache>>,
    ) -> Self {
        let mut resolver = EntityResolver::new(directory, config.resolver.clone());
        if let Some(cache) = cache {
            resolver = resolver.with_cache(cache);
        }
        let validator = QueryValidator::new(config.validator.clone());
        let generator = LlmQueryGenerator::new(
            runner,
            config.generator.clone(),
            validator.clone(),
            vocabulary.clone(),
        );

        Self::new(vocabulary, resolver, generator, validator)
            .with_namespace_prefix(config.namespace_prefix.clone())
    }

    pub fn with_namespace_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.namespace_prefix = prefix.into();
        self
    }

    pub fn namespace_for(&self, user_id: &str) -> String {
        user_namespace(&self.namespace_prefix, user_id)
    }

    pub fn classify(&self, question: &str) -> TemplateTag {
        self.classifier.classify(question)
    }

    /// Produce a validated statement for `question` in the user's namespace.
    ///
    /// Template tags are served deterministically. An entity template with
    /// no extracted reference goes to the model instead. Any failure to
    /// build or validate surfaces as the fixed, retryable generation error.
    pub async fn generate(&self, question: &str, user_id: &str) -> GraphMindResult<GeneratedQuery> {
        let question = question.trim();
        if question.is_empty() {
            return Err(GraphMindError::validation("Question is empty"));
        }
        let namespace = self.namespace_for(user_id);

        let tag = self.classifier.classify(question);
        let references = self.extractor.extract(question);

        if !tag.is_template() || (tag.requires_entity() && references.is_empty()) {
            debug!(template = %tag, references = references.len(), "Routing question to model");
            return self.generator.generate(question, &namespace).await;
        }

        let entities = if tag.requires_entity() {
            let texts: Vec<&str> = references.iter().map(|r| r.text.as_str()).collect();
            self.resolver.resolve_all(&texts, user_id).await
        } else {
            Vec::new()
        };

        let built = self.builder.build(tag, question, &entities).map_err(|e| {
            warn!(template = %tag, error = %e, "Template could not be built");
            GraphMindError::query_generation()
        })?;

        self.validator
            .validate_query(&built.in_namespace(namespace), ValidationMode::Sanitize)
            .map_err(|e| {
                warn!(template = %tag, category = %e.category, "Template statement failed validation");
                GraphMindError::query_generation()
            })
    }

    /// Generate, execute read-only and format.
    pub async fn answer(
        &self,
        store: &dyn GraphStore,
        question: &str,
        user_id: &str,
    ) -> GraphMindResult<(GeneratedQuery, QueryResult)> {
        let query = self.generate(question, user_id).await?;
        let rows = store
            .execute_read_only(&query.namespace, &GraphStatement::from(&query))
            .await?;

        let result = format_auto(&rows, &query.statement, &query.namespace);
        if let Some(message) = &result.metadata.debug_message {
            debug!(template = %query.template_used, "{}", message);
        }
        Ok((query, result))
    }
}
