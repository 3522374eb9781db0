//! Factory for creating model runners.

use std::sync::Arc;

use graphmind_core::error::GraphMindResult;
use graphmind_core::traits::{LlmConfig, LlmProvider, ModelRunner};

use crate::openai_compat::OpenAiCompatRunner;
use crate::workers_ai::WorkersAiRunner;

/// Factory for creating model runners.
pub struct RunnerFactory;

impl RunnerFactory {
    /// Create a runner from the given configuration.
    pub fn create(config: LlmConfig) -> GraphMindResult<Arc<dyn ModelRunner>> {
        match config.provider {
            LlmProvider::WorkersAi => {
                let runner = WorkersAiRunner::new(config)?;
                Ok(Arc::new(runner))
            }
            LlmProvider::OpenAiCompatible => {
                let runner = OpenAiCompatRunner::new(config)?;
                Ok(Arc::new(runner))
            }
        }
    }

    /// Workers AI runner with credentials from the environment.
    pub fn workers_ai() -> GraphMindResult<Arc<dyn ModelRunner>> {
        Self::create(LlmConfig {
            provider: LlmProvider::WorkersAi,
            ..Default::default()
        })
    }

    /// OpenAI-compatible runner against `base_url`.
    pub fn openai_compatible(base_url: impl Into<String>) -> GraphMindResult<Arc<dyn ModelRunner>> {
        Self::create(LlmConfig {
            provider: LlmProvider::OpenAiCompatible,
            base_url: Some(base_url.into()),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_picks_provider() {
        let runner = RunnerFactory::create(LlmConfig {
            provider: LlmProvider::OpenAiCompatible,
            api_key: Some("k".into()),
            base_url: Some("http://localhost:8080/v1".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(runner.provider_name(), "openai_compatible");

        let runner = RunnerFactory::create(LlmConfig {
            api_key: Some("t".into()),
            account_id: Some("a".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(runner.provider_name(), "workers_ai");
    }
}
