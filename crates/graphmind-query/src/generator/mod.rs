//! Model fallback for questions no template covers.
//!
//! Two tiers are tried in order, a fast model then a larger one. Each tier
//! races its model call against a timer, repairs the output and validates it
//! in sanitize mode; any failure moves on to the next tier. When both fail
//! the caller gets one fixed, retryable error whatever the cause.

pub mod prompt;
pub mod repair;

use std::sync::Arc;
use std::time::Instant;

use serde_json::Map;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use graphmind_core::config::{GeneratorConfig, TierConfig};
use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::{ModelRequest, ModelRunner};
use graphmind_core::types::{GeneratedQuery, TemplateTag, ValidationCategory};

use crate::validator::{QueryValidator, ValidationContext};
use crate::vocabulary::QueryVocabulary;

pub use repair::repair_output;

/// Characters of the question kept in failure logs.
const LOG_SAMPLE_CHARS: usize = 40;
/// Hex characters of the question hash kept in failure logs.
const LOG_HASH_CHARS: usize = 16;

/// Why a tier produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierFailure {
    Timeout { elapsed_ms: u64 },
    /// The runner returned an error; only its code is kept.
    Model { code: &'static str },
    EmptyOutput,
    Rejected(ValidationCategory),
}

impl TierFailure {
    /// Short category for logs.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "timeout",
            Self::Model { .. } => "model_error",
            Self::EmptyOutput => "empty_output",
            Self::Rejected(category) => category.into(),
        }
    }
}

/// Result of one tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome {
    Generated(GeneratedQuery),
    Failed(TierFailure),
}

/// Loggable stand-in for a question: its length, a truncated hash and a
/// short sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionFingerprint {
    pub length: usize,
    pub hash: String,
    pub sample: String,
}

impl QuestionFingerprint {
    pub fn new(question: &str) -> Self {
        let digest = Sha256::digest(question.as_bytes());
        let mut hash = hex::encode(digest);
        hash.truncate(LOG_HASH_CHARS);
        Self {
            length: question.chars().count(),
            hash,
            sample: question.chars().take(LOG_SAMPLE_CHARS).collect(),
        }
    }
}

/// Generates statements with a model when templates do not apply.
pub struct LlmQueryGenerator {
    runner: Arc<dyn ModelRunner>,
    config: GeneratorConfig,
    validator: QueryValidator,
    vocabulary: Arc<QueryVocabulary>,
}

impl LlmQueryGenerator {
    pub fn new(
        runner: Arc<dyn ModelRunner>,
        config: GeneratorConfig,
        validator: QueryValidator,
        vocabulary: Arc<QueryVocabulary>,
    ) -> Self {
        Self {
            runner,
            config,
            validator,
            vocabulary,
        }
    }

    /// Generate a validated statement for `question` in `namespace`.
    pub async fn generate(&self, question: &str, namespace: &str) -> GraphMindResult<GeneratedQuery> {
        let tiers = [("fast", &self.config.fast), ("large", &self.config.large)];

        for (name, tier) in tiers {
            match self.run_tier(tier, question, namespace).await {
                TierOutcome::Generated(query) => {
                    debug!(tier = name, model = %tier.model_id, "Model generated statement");
                    return Ok(query);
                }
                TierOutcome::Failed(failure) => {
                    let fingerprint = QuestionFingerprint::new(question);
                    warn!(
                        tier = name,
                        model = %tier.model_id,
                        category = failure.category(),
                        question_len = fingerprint.length,
                        question_hash = %fingerprint.hash,
                        sample = %fingerprint.sample,
                        "Model tier failed"
                    );
                }
            }
        }

        Err(GraphMindError::query_generation())
    }

    /// Run one tier to completion or failure.
    pub async fn run_tier(&self, tier: &TierConfig, question: &str, namespace: &str) -> TierOutcome {
        let request = ModelRequest::new(prompt::messages(&self.vocabulary, question))
            .with_max_tokens(tier.max_tokens)
            .with_temperature(tier.temperature);

        let started = Instant::now();
        let raw = match tokio::time::timeout(
            tier.timeout(),
            self.runner.run(&tier.model_id, &request),
        )
        .await
        {
            Err(_) => {
                return TierOutcome::Failed(TierFailure::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => {
                return TierOutcome::Failed(TierFailure::Model {
                    code: e.code().as_str(),
                })
            }
            Ok(Ok(text)) => text,
        };

        let Some(statement) = repair_output(&raw) else {
            return TierOutcome::Failed(TierFailure::EmptyOutput);
        };

        let context = ValidationContext::sanitize().in_namespace(namespace);
        match self.validator.validate(&statement, &Map::new(), &context) {
            Ok(validated) => TierOutcome::Generated(GeneratedQuery {
                statement: validated.statement,
                parameters: validated.parameters,
                template_used: TemplateTag::LlmGenerate,
                namespace: namespace.to_string(),
            }),
            Err(e) => TierOutcome::Failed(TierFailure::Rejected(e.category)),
        }
    }
}
