//! Safety validation for read statements.
//!
//! Every statement, from a template or a model, passes through
//! [`QueryValidator`] before anyone executes it. A statement that passes has
//! one executable clause, no mutating keyword, a bound no larger than the
//! configured maximum and a value for every placeholder.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use graphmind_core::config::ValidatorConfig;
use graphmind_core::error::GraphMindError;
use graphmind_core::types::{GeneratedQuery, ValidationCategory};

use crate::lexer;

/// Mutating keywords, matched as case-insensitive substrings anywhere in the
/// statement, literals included.
pub const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "CREATE", "MERGE", "DELETE", "DETACH", "SET", "REMOVE", "DROP", "LOAD CSV", "FOREACH",
];

static READ_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(OPTIONAL\s+MATCH|MATCH|UNWIND|WITH|CALL\s+db\.)").unwrap());

static RETURN_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bRETURN\b").unwrap());

static LIMIT_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bLIMIT\b").unwrap());

/// What may follow `LIMIT`: an integer or a parameter, then the end of the
/// statement or the start of another clause.
static LIMIT_ARGUMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(\$[A-Za-z_][A-Za-z0-9_]*|[0-9]+)(?:\s*$|\s*[;)}]|\s+(?:OPTIONAL|MATCH|WITH|UNWIND|CALL|RETURN)\b)",
    )
    .unwrap()
});

static UNION_CLAUSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bUNION\b").unwrap());

static NAMESPACE_SELECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bUSE\s+([A-Za-z_][A-Za-z0-9_.\-]*)").unwrap());

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Whether missing bounds are an error or get injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    #[default]
    Validate,
    Sanitize,
}

/// Where a statement is headed and how strictly to check it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// Namespace the caller will execute in.
    pub namespace: Option<String>,
    pub mode: ValidationMode,
}

impl ValidationContext {
    pub fn validate() -> Self {
        Self::default()
    }

    pub fn sanitize() -> Self {
        Self {
            mode: ValidationMode::Sanitize,
            ..Self::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// A categorized rejection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{category}: {message}")]
pub struct ValidationError {
    pub category: ValidationCategory,
    pub message: String,
}

impl ValidationError {
    fn new(category: ValidationCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }

    pub fn is_fixable(&self) -> bool {
        self.category.is_fixable()
    }

    pub fn is_blocked(&self) -> bool {
        self.category.is_blocked()
    }
}

impl From<ValidationError> for GraphMindError {
    fn from(e: ValidationError) -> Self {
        GraphMindError::query_rejected(e.category, e.message)
    }
}

/// A statement that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedQuery {
    pub statement: String,
    pub parameters: Map<String, Value>,
    /// Whether sanitizing changed the text.
    pub modified: bool,
    /// Parameters bound but never referenced.
    pub unused_parameters: Vec<String>,
}

pub type ValidationOutcome = Result<ValidatedQuery, ValidationError>;

/// Validates and sanitizes statements.
#[derive(Debug, Clone, Default)]
pub struct QueryValidator {
    config: ValidatorConfig,
}

impl QueryValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a generated query, keeping its metadata.
    pub fn validate_query(
        &self,
        query: &GeneratedQuery,
        mode: ValidationMode,
    ) -> Result<GeneratedQuery, ValidationError> {
        let mut context = ValidationContext {
            namespace: None,
            mode,
        };
        if !query.namespace.is_empty() {
            context.namespace = Some(query.namespace.clone());
        }
        let validated = self.validate(&query.statement, &query.parameters, &context)?;
        Ok(GeneratedQuery {
            statement: validated.statement,
            parameters: validated.parameters,
            template_used: query.template_used,
            namespace: query.namespace.clone(),
        })
    }

    /// Check `statement` against every rule. In sanitize mode comments are
    /// removed, the text trimmed, one trailing terminator dropped and a
    /// default bound added when missing before the checks run again.
    pub fn validate(
        &self,
        statement: &str,
        parameters: &Map<String, Value>,
        context: &ValidationContext,
    ) -> ValidationOutcome {
        match context.mode {
            ValidationMode::Validate => self.check(statement, parameters, context),
            ValidationMode::Sanitize => {
                // Comments are dropped before any bound is appended.
                reject_destructive(statement)?;
                reject_unterminated(statement)?;
                let uncommented = lexer::strip_comments(statement);
                let trimmed = strip_terminator(&uncommented);
                match self.check(trimmed, parameters, context) {
                    Err(e) if e.category == ValidationCategory::MissingLimit => {
                        let bounded = format!("{} LIMIT {}", trimmed, self.config.default_limit);
                        debug!(limit = self.config.default_limit, "Injected default bound");
                        let mut validated = self.check(&bounded, parameters, context)?;
                        validated.modified = true;
                        Ok(validated)
                    }
                    Ok(mut validated) => {
                        validated.modified = trimmed != statement;
                        Ok(validated)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn check(
        &self,
        statement: &str,
        parameters: &Map<String, Value>,
        context: &ValidationContext,
    ) -> ValidationOutcome {
        use ValidationCategory::*;

        if statement.trim().is_empty() {
            return Err(ValidationError::new(InvalidQuery, "Statement is empty"));
        }
        if statement.chars().count() > self.config.max_statement_length {
            return Err(ValidationError::new(
                InvalidQuery,
                format!("Statement exceeds {} characters", self.config.max_statement_length),
            ));
        }

        reject_destructive(statement)?;

        reject_unterminated(statement)?;
        let plain = lexer::neutralize(statement);

        for caps in NAMESPACE_SELECTION.captures_iter(&plain) {
            let selected = &caps[1];
            if context.namespace.as_deref() != Some(selected) {
                return Err(ValidationError::new(
                    InvalidQuery,
                    "Statement selects a different namespace",
                ));
            }
        }

        if lexer::has_multiple_statements(statement) {
            return Err(ValidationError::new(
                MultiStatement,
                "Only one statement may be executed",
            ));
        }

        if UNION_CLAUSE.is_match(&plain) {
            return Err(ValidationError::new(
                MultiStatement,
                "UNION combines more than one statement",
            ));
        }

        if !READ_CLAUSE.is_match(&plain) || !RETURN_CLAUSE.is_match(&plain) {
            return Err(ValidationError::new(
                InvalidSyntax,
                "Statement needs a MATCH-style clause and a RETURN clause",
            ));
        }

        let placeholders = lexer::placeholders(statement);
        if let Some(missing) = placeholders.iter().find(|p| !parameters.contains_key(*p)) {
            return Err(ValidationError::new(
                InvalidQuery,
                format!("No value bound for ${}", missing),
            ));
        }
        let unused_parameters: Vec<String> = parameters
            .keys()
            .filter(|k| !placeholders.contains(*k))
            .cloned()
            .collect();
        if !unused_parameters.is_empty() {
            warn!(unused = ?unused_parameters, "Bound parameters are never referenced");
        }

        self.check_bounds(&plain, parameters)?;

        Ok(ValidatedQuery {
            statement: statement.to_string(),
            parameters: parameters.clone(),
            modified: false,
            unused_parameters,
        })
    }

    fn check_bounds(&self, plain: &str, parameters: &Map<String, Value>) -> Result<(), ValidationError> {
        use ValidationCategory::*;

        let last_return = RETURN_CLAUSE.find_iter(plain).last().map_or(0, |m| m.start());
        let mut bounds_result = false;
        // `n.limit` is a property, not a clause
        let clauses = LIMIT_CLAUSE
            .find_iter(plain)
            .filter(|m| !plain[..m.start()].trim_end().ends_with('.'));
        for keyword in clauses {
            if keyword.start() > last_return {
                bounds_result = true;
            }
            let token = match LIMIT_ARGUMENT.captures(&plain[keyword.end()..]) {
                Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
                None => {
                    return Err(ValidationError::new(
                        InvalidQuery,
                        "LIMIT takes an integer or a parameter",
                    ));
                }
            };
            let bound = match token.strip_prefix('$') {
                Some(name) => parameters.get(name).and_then(Value::as_u64),
                None => token.parse::<u64>().ok(),
            };
            match bound {
                Some(n) if n > self.config.max_limit => {
                    return Err(ValidationError::new(
                        LimitExceeded,
                        format!("Bound {} exceeds maximum {}", n, self.config.max_limit),
                    ));
                }
                Some(_) => {}
                None => {
                    return Err(ValidationError::new(
                        InvalidQuery,
                        "Bound must be a non-negative integer",
                    ));
                }
            }
        }

        if bounds_result {
            Ok(())
        } else {
            Err(ValidationError::new(MissingLimit, "Result has no LIMIT clause"))
        }
    }
}

fn reject_destructive(statement: &str) -> Result<(), ValidationError> {
    match find_destructive_keyword(statement) {
        Some(keyword) => Err(ValidationError::new(
            ValidationCategory::DestructiveOperation,
            format!("Statement contains {}", keyword),
        )),
        None => Ok(()),
    }
}

fn reject_unterminated(statement: &str) -> Result<(), ValidationError> {
    if lexer::has_unterminated_span(statement) {
        return Err(ValidationError::new(
            ValidationCategory::InvalidSyntax,
            "Unterminated quoted text or comment",
        ));
    }
    Ok(())
}

/// First mutating keyword contained in `statement`.
pub fn find_destructive_keyword(statement: &str) -> Option<&'static str> {
    let upper = WHITESPACE.replace_all(&statement.to_uppercase(), " ").into_owned();
    DESTRUCTIVE_KEYWORDS.iter().copied().find(|k| upper.contains(k))
}

/// Trim and drop one trailing terminator.
pub fn strip_terminator(statement: &str) -> &str {
    let trimmed = statement.trim();
    trimmed.strip_suffix(';').map(str::trim_end).unwrap_or(trimmed)
}
