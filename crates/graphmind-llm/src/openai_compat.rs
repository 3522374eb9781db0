//! Runner for any OpenAI-compatible `/chat/completions` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::{LlmConfig, ModelRequest, ModelRunner};

use crate::http;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions runner.
pub struct OpenAiCompatRunner {
    client: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl OpenAiCompatRunner {
    /// Create a runner. The key falls back to `OPENAI_API_KEY`.
    pub fn new(config: LlmConfig) -> GraphMindResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .map(SecretString::new)
            .ok_or_else(|| {
                GraphMindError::Configuration("API key not found. Set OPENAI_API_KEY environment variable or provide api_key in config.".to_string())
            })?;
        let base_url = http::base_url(config.base_url.as_deref().unwrap_or(OPENAI_API_URL))?;

        Ok(Self {
            client: http::client(&api_key, config.request_timeout_ms)?,
            base_url,
        })
    }
}

fn request_body<'a>(model_id: &'a str, request: &'a ModelRequest) -> ChatRequest<'a> {
    ChatRequest {
        model: model_id,
        messages: request
            .messages
            .iter()
            .map(|m| ChatMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

fn parse_response(status: reqwest::StatusCode, body: &str) -> GraphMindResult<String> {
    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(GraphMindError::llm(format!("Chat completions error ({}): {}", status, message)));
    }

    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| http::invalid_response(format!("Failed to parse chat response: {}", e)))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| http::invalid_response("Chat response has no content"))
}

#[async_trait]
impl ModelRunner for OpenAiCompatRunner {
    async fn run(&self, model_id: &str, request: &ModelRequest) -> GraphMindResult<String> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request_body(model_id, request))
            .send()
            .await
            .map_err(|e| http::request_error("Chat completions", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::request_error("Chat completions", e))?;

        let text = parse_response(status, &body)?;
        debug!(model = model_id, chars = text.len(), "Chat completion finished");
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "openai_compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphmind_core::types::Message;
    use reqwest::StatusCode;

    #[test]
    fn test_request_body_carries_model() {
        let request = ModelRequest::new(vec![Message::user("hi")]);
        let body = serde_json::to_value(request_body("gpt-4o-mini", &request)).unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[test]
    fn test_parse_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"MATCH (n) RETURN n LIMIT 2"}}]}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), "MATCH (n) RETURN n LIMIT 2");
    }

    #[test]
    fn test_parse_error_body() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#;
        let err = parse_response(StatusCode::TOO_MANY_REQUESTS, body).unwrap_err();
        assert!(err.to_string().contains("Rate limit reached"));
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        assert!(parse_response(StatusCode::OK, r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn test_bad_base_url_rejected() {
        let result = OpenAiCompatRunner::new(LlmConfig {
            api_key: Some("k".into()),
            base_url: Some("not a url".into()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
