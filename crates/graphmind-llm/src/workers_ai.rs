//! Cloudflare Workers AI model runner.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::{LlmConfig, ModelRequest, ModelRunner};
use graphmind_core::types::Message;

use crate::http;

const WORKERS_AI_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Workers AI runner (`POST /accounts/{account}/ai/run/{model}`).
pub struct WorkersAiRunner {
    client: Client,
    account_id: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    messages: Vec<RunMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct RunMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    result: Option<RunResult>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    #[serde(default)]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: i64,
    message: String,
}

impl WorkersAiRunner {
    /// Create a runner. The token and account fall back to
    /// `CLOUDFLARE_API_TOKEN` and `CLOUDFLARE_ACCOUNT_ID`.
    pub fn new(config: LlmConfig) -> GraphMindResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("CLOUDFLARE_API_TOKEN").ok())
            .map(SecretString::new)
            .ok_or_else(|| {
                GraphMindError::Configuration("Workers AI token not found. Set CLOUDFLARE_API_TOKEN environment variable or provide api_key in config.".to_string())
            })?;
        let account_id = config
            .account_id
            .clone()
            .or_else(|| std::env::var("CLOUDFLARE_ACCOUNT_ID").ok())
            .ok_or_else(|| {
                GraphMindError::Configuration("Workers AI account not found. Set CLOUDFLARE_ACCOUNT_ID environment variable or provide account_id in config.".to_string())
            })?;

        let base_url = http::base_url(config.base_url.as_deref().unwrap_or(WORKERS_AI_API_URL))?;

        Ok(Self {
            client: http::client(&api_key, config.request_timeout_ms)?,
            account_id,
            base_url,
        })
    }

    fn run_url(&self, model_id: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url,
            self.account_id,
            model_id.trim_start_matches('/')
        )
    }
}

fn request_body<'a>(messages: &'a [Message], request: &ModelRequest) -> RunRequest<'a> {
    RunRequest {
        messages: messages
            .iter()
            .map(|m| RunMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        max_tokens: request.max_tokens,
        temperature: request.temperature,
    }
}

/// Extract the generated text from a response body.
fn parse_response(status: reqwest::StatusCode, body: &str) -> GraphMindResult<String> {
    let parsed: Result<RunResponse, _> = serde_json::from_str(body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .and_then(|r| r.errors.into_iter().next())
            .map(|e| format!("{} (code {})", e.message, e.code))
            .unwrap_or_else(|| body.chars().take(200).collect());
        return Err(GraphMindError::llm(format!("Workers AI error ({}): {}", status, message)));
    }

    let response = parsed
        .map_err(|e| http::invalid_response(format!("Failed to parse Workers AI response: {}", e)))?;
    if !response.success {
        let message = response
            .errors
            .first()
            .map(|e| e.message.clone())
            .unwrap_or_else(|| "unsuccessful run".to_string());
        return Err(GraphMindError::llm(format!("Workers AI error: {}", message)));
    }

    response
        .result
        .and_then(|r| r.response)
        .ok_or_else(|| http::invalid_response("Workers AI response has no text"))
}

#[async_trait]
impl ModelRunner for WorkersAiRunner {
    async fn run(&self, model_id: &str, request: &ModelRequest) -> GraphMindResult<String> {
        let response = self
            .client
            .post(self.run_url(model_id))
            .json(&request_body(&request.messages, request))
            .send()
            .await
            .map_err(|e| http::request_error("Workers AI", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| http::request_error("Workers AI", e))?;

        let text = parse_response(status, &body)?;
        debug!(model = model_id, chars = text.len(), "Workers AI run completed");
        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "workers_ai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn runner() -> WorkersAiRunner {
        WorkersAiRunner::new(LlmConfig {
            api_key: Some("token".into()),
            account_id: Some("acct".into()),
            base_url: Some("https://example.test/client/v4/".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_run_url() {
        assert_eq!(
            runner().run_url("@cf/meta/llama-3.1-8b-instruct-fast"),
            "https://example.test/client/v4/accounts/acct/ai/run/@cf/meta/llama-3.1-8b-instruct-fast"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = ModelRequest::new(vec![Message::system("rules"), Message::user("question")])
            .with_max_tokens(64)
            .with_temperature(0.2);
        let body = serde_json::to_value(request_body(&request.messages, &request)).unwrap();
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "question");
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn test_parse_success() {
        let body = r#"{"result":{"response":"MATCH (n) RETURN n LIMIT 1"},"success":true,"errors":[],"messages":[]}"#;
        assert_eq!(parse_response(StatusCode::OK, body).unwrap(), "MATCH (n) RETURN n LIMIT 1");
    }

    #[test]
    fn test_parse_api_error() {
        let body = r#"{"result":null,"success":false,"errors":[{"code":5007,"message":"No such model"}]}"#;
        let err = parse_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(err.to_string().contains("No such model"));
    }

    #[test]
    fn test_parse_missing_text() {
        let body = r#"{"result":{},"success":true,"errors":[]}"#;
        assert!(parse_response(StatusCode::OK, body).is_err());
    }

    #[test]
    fn test_missing_account_is_configuration_error() {
        std::env::remove_var("CLOUDFLARE_ACCOUNT_ID");
        let result = WorkersAiRunner::new(LlmConfig {
            api_key: Some("token".into()),
            ..Default::default()
        });
        assert!(matches!(result, Err(GraphMindError::Configuration(_))));
    }
}
