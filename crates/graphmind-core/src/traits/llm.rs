//! Model invocation trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GraphMindResult;
use crate::types::Message;

/// A single model invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Runs a named model and returns its text output.
///
/// Implementations must be cancel-safe: callers race `run` against a timer
/// and drop the future when the timer wins.
#[async_trait]
pub trait ModelRunner: Send + Sync {
    /// Run `model_id` on the request and return the generated text.
    async fn run(&self, model_id: &str, request: &ModelRequest) -> GraphMindResult<String>;

    /// Provider name, for logs.
    fn provider_name(&self) -> &str;
}

/// Model provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Cloudflare Workers AI REST API.
    #[default]
    WorkersAi,
    /// Any OpenAI-compatible `/chat/completions` endpoint.
    OpenAiCompatible,
}

/// Connection settings for a model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    /// API token (if not using environment variable).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Account identifier, required by Workers AI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Base URL for API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Transport-level timeout, independent of the per-tier race.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

pub(crate) fn default_temperature() -> f32 {
    0.1
}

pub(crate) fn default_max_tokens() -> u32 {
    256
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            api_key: None,
            account_id: None,
            base_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}
