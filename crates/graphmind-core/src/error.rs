//! Error types for graphmind operations.
//!
//! Every variant carries a structured [`ErrorCode`] so callers can branch on
//! the failure without parsing messages. Validation failures additionally carry
//! their [`ValidationCategory`], which separates fixable problems (a missing
//! bound clause) from blocked ones (a mutating statement).

use std::collections::HashMap;
use thiserror::Error;

use crate::types::ValidationCategory;

/// Result type alias for graphmind operations.
pub type GraphMindResult<T> = Result<T, GraphMindError>;

/// The one message end users see when no safe statement could be produced.
pub const QUERY_GENERATION_USER_MESSAGE: &str =
    "I couldn't understand that question. Could you try rephrasing it?";

/// Main error type for all graphmind operations.
#[derive(Error, Debug)]
pub enum GraphMindError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
    },

    /// A statement was refused by the query validator.
    #[error("Query rejected ({category}): {message}")]
    QueryValidation {
        category: ValidationCategory,
        message: String,
    },

    /// No safe statement could be produced for a question.
    #[error("{message}")]
    QueryGeneration { message: String, retryable: bool },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Graph store operation failed.
    #[error("Graph store error: {message}")]
    GraphStore {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Entity directory operation failed.
    #[error("Directory error: {message}")]
    Directory {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cache operation failed.
    #[error("Cache error: {message}")]
    Cache { message: String, code: ErrorCode },

    /// Entity not found.
    #[error("Entity not found: {entity_key}")]
    EntityNotFound { entity_key: String, code: ErrorCode },

    /// A merge batch failed; nothing after the failing statement was applied.
    #[error("Merge failed: {message} ({relationships_planned} relationships and {properties_merged} properties computed but not applied)")]
    MergeFailed {
        message: String,
        relationships_planned: usize,
        properties_merged: usize,
        code: ErrorCode,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error.
    #[error("Network error: {message}")]
    Network {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("Timed out after {elapsed_ms}ms: {message}")]
    Timeout { message: String, elapsed_ms: u64 },

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// Parse error.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,
    ValInvalidFormat,

    // Query (QRY_xxx)
    QryRejected,
    QryGenerationFailed,

    // LLM (LLM_xxx)
    LlmConnectionFailed,
    LlmGenerationFailed,
    LlmInvalidResponse,
    LlmTimeout,

    // Graph (GRP_xxx)
    GrpConnectionFailed,
    GrpOperationFailed,
    GrpInvalidResponse,

    // Directory (DIR_xxx)
    DirOperationFailed,

    // Cache (CACHE_xxx)
    CacheOperationFailed,

    // Entity (ENT_xxx)
    EntNotFound,
    EntMergeFailed,

    // Network (NET_xxx)
    NetTimeout,
    NetConnectionFailed,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidReply,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ValInvalidFormat => "VAL_003",
            ErrorCode::QryRejected => "QRY_001",
            ErrorCode::QryGenerationFailed => "QRY_002",
            ErrorCode::LlmConnectionFailed => "LLM_001",
            ErrorCode::LlmGenerationFailed => "LLM_002",
            ErrorCode::LlmInvalidResponse => "LLM_003",
            ErrorCode::LlmTimeout => "LLM_004",
            ErrorCode::GrpConnectionFailed => "GRP_001",
            ErrorCode::GrpOperationFailed => "GRP_002",
            ErrorCode::GrpInvalidResponse => "GRP_003",
            ErrorCode::DirOperationFailed => "DIR_001",
            ErrorCode::CacheOperationFailed => "CACHE_001",
            ErrorCode::EntNotFound => "ENT_001",
            ErrorCode::EntMergeFailed => "ENT_002",
            ErrorCode::NetTimeout => "NET_001",
            ErrorCode::NetConnectionFailed => "NET_002",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidReply => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl GraphMindError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
        }
    }

    /// Create a query validation error with its category.
    pub fn query_rejected(category: ValidationCategory, message: impl Into<String>) -> Self {
        Self::QueryValidation {
            category,
            message: message.into(),
        }
    }

    /// The fixed, retryable, user-facing generation failure.
    pub fn query_generation() -> Self {
        Self::QueryGeneration {
            message: QUERY_GENERATION_USER_MESSAGE.to_string(),
            retryable: true,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create a graph store error.
    pub fn graph_store(message: impl Into<String>) -> Self {
        Self::GraphStore {
            message: message.into(),
            code: ErrorCode::GrpOperationFailed,
            source: None,
        }
    }

    /// Create a directory error.
    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory {
            message: message.into(),
            code: ErrorCode::DirOperationFailed,
            source: None,
        }
    }

    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            code: ErrorCode::CacheOperationFailed,
        }
    }

    /// Create a not found error.
    pub fn entity_not_found(entity_key: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity_key: entity_key.into(),
            code: ErrorCode::EntNotFound,
        }
    }

    /// Create a merge failure with the counts that were not applied.
    pub fn merge_failed(
        message: impl Into<String>,
        relationships_planned: usize,
        properties_merged: usize,
    ) -> Self {
        Self::MergeFailed {
            message: message.into(),
            relationships_planned,
            properties_merged,
            code: ErrorCode::EntMergeFailed,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidJson,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            code: ErrorCode::NetConnectionFailed,
            source: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            message: message.into(),
            elapsed_ms,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::QueryValidation { .. } => ErrorCode::QryRejected,
            Self::QueryGeneration { .. } => ErrorCode::QryGenerationFailed,
            Self::Llm { code, .. } => *code,
            Self::GraphStore { code, .. } => *code,
            Self::Directory { code, .. } => *code,
            Self::Cache { code, .. } => *code,
            Self::EntityNotFound { code, .. } => *code,
            Self::MergeFailed { code, .. } => *code,
            Self::Network { code, .. } => *code,
            Self::Timeout { .. } => ErrorCode::NetTimeout,
            Self::Parse { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Validation category, if this is a validator rejection.
    pub fn validation_category(&self) -> Option<ValidationCategory> {
        match self {
            Self::QueryValidation { category, .. } => Some(*category),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::QueryGeneration { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Llm { code, .. } => matches!(code, ErrorCode::LlmTimeout | ErrorCode::LlmConnectionFailed),
            _ => false,
        }
    }

    /// Message safe to show an end user. Internal detail never leaks through here.
    pub fn user_message(&self) -> &str {
        match self {
            Self::QueryGeneration { message, .. } => message,
            _ => QUERY_GENERATION_USER_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error() {
        let err = GraphMindError::validation("Invalid input");
        assert_eq!(err.code(), ErrorCode::ValInvalidInput);
        assert!(err.to_string().contains("Invalid input"));
    }

    #[test]
    fn test_query_rejected_carries_category() {
        let err = GraphMindError::query_rejected(ValidationCategory::LimitExceeded, "LIMIT 500 > 100");
        assert_eq!(err.validation_category(), Some(ValidationCategory::LimitExceeded));
        assert_eq!(err.code().as_str(), "QRY_001");
        assert!(err.to_string().contains("LIMIT_EXCEEDED"));
    }

    #[test]
    fn test_query_generation_is_fixed_and_retryable() {
        let err = GraphMindError::query_generation();
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), QUERY_GENERATION_USER_MESSAGE);
        assert_eq!(err.to_string(), QUERY_GENERATION_USER_MESSAGE);
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = GraphMindError::graph_store("connection refused to 10.0.0.3");
        assert!(!err.user_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_merge_failed_reports_counts() {
        let err = GraphMindError::merge_failed("batch step 2 failed", 3, 5);
        let text = err.to_string();
        assert!(text.contains("3 relationships"));
        assert!(text.contains("5 properties"));
        assert_eq!(err.code(), ErrorCode::EntMergeFailed);
    }

    #[test]
    fn test_error_code_as_str() {
        assert_eq!(ErrorCode::ValInvalidInput.as_str(), "VAL_001");
        assert_eq!(ErrorCode::EntNotFound.as_str(), "ENT_001");
    }
}
