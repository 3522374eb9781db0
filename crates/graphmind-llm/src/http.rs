//! Shared HTTP plumbing for the runners.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use url::Url;

use graphmind_core::error::{ErrorCode, GraphMindError, GraphMindResult};

/// Build a client with the bearer token and transport timeout.
pub(crate) fn client(api_key: &SecretString, timeout_ms: u64) -> GraphMindResult<Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    let mut auth: reqwest::header::HeaderValue = format!("Bearer {}", api_key.expose_secret())
        .parse()
        .map_err(|_| GraphMindError::Configuration("Invalid API key format".to_string()))?;
    auth.set_sensitive(true);
    headers.insert(reqwest::header::AUTHORIZATION, auth);
    headers.insert(
        reqwest::header::CONTENT_TYPE,
        "application/json"
            .parse()
            .map_err(|_| GraphMindError::Configuration("Invalid content type".to_string()))?,
    );

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(|e| GraphMindError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

/// Validate a base URL and strip any trailing slash.
pub(crate) fn base_url(raw: &str) -> GraphMindResult<String> {
    Url::parse(raw)
        .map_err(|e| GraphMindError::Configuration(format!("Invalid base URL {:?}: {}", raw, e)))?;
    Ok(raw.trim_end_matches('/').to_string())
}

/// Classify a transport failure.
pub(crate) fn request_error(provider: &str, e: reqwest::Error) -> GraphMindError {
    let code = if e.is_timeout() {
        ErrorCode::LlmTimeout
    } else if e.is_connect() {
        ErrorCode::LlmConnectionFailed
    } else {
        ErrorCode::LlmGenerationFailed
    };
    GraphMindError::Llm {
        message: format!("{} request failed: {}", provider, e),
        code,
        source: Some(Box::new(e)),
    }
}

pub(crate) fn invalid_response(message: impl Into<String>) -> GraphMindError {
    GraphMindError::Llm {
        message: message.into(),
        code: ErrorCode::LlmInvalidResponse,
        source: None,
    }
}
