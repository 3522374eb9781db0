//! Configuration system for graphmind.
//!
//! One [`GraphMindConfig`] carries a section per component. Components take
//! their section by value in their constructors, so tests and per-tenant
//! setups can override any of it without touching globals.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{GraphMindError, GraphMindResult};
use crate::traits::{GraphStoreConfig, LlmConfig, LlmProvider};

/// One step of the model escalation chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierConfig {
    pub model_id: String,
    pub timeout_ms: u64,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl TierConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Settings for the model fallback generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Small model tried first.
    pub fast: TierConfig,
    /// Larger model tried when the fast tier fails.
    pub large: TierConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            fast: TierConfig {
                model_id: "@cf/meta/llama-3.1-8b-instruct-fast".to_string(),
                timeout_ms: 3_000,
                max_tokens: 256,
                temperature: 0.1,
            },
            large: TierConfig {
                model_id: "@cf/meta/llama-3.3-70b-instruct-fp8-fast".to_string(),
                timeout_ms: 5_000,
                max_tokens: 384,
                temperature: 0.1,
            },
        }
    }
}

/// Settings for the query validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Largest bound a statement may request.
    pub max_limit: u64,
    /// Bound injected by the sanitizer when none is present.
    pub default_limit: u64,
    /// Longest statement accepted, in characters.
    pub max_statement_length: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_limit: 100,
            default_limit: 50,
            max_statement_length: 4_000,
        }
    }
}

/// Settings for the entity resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Fuzzy matches need a similarity strictly above this...
    pub min_similarity: f64,
    /// ...or an edit distance at most this.
    pub max_edit_distance: usize,
    /// Directory rows scanned per fuzzy lookup.
    pub candidate_limit: usize,
    /// Lifetime of cached resolutions.
    pub cache_ttl_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.6,
            max_edit_distance: 2,
            candidate_limit: 1_000,
            cache_ttl_secs: 3_600,
        }
    }
}

impl ResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// How conflicting properties are combined during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Survivor keeps its values; gaps are filled from the absorbed entity.
    #[default]
    TargetWins,
    /// Absorbed entity's values overwrite the survivor's.
    SourceWins,
}

/// Settings for duplicate discovery and merging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Minimum similarity for a duplicate candidate.
    pub similarity_threshold: f64,
    /// Number of recent same-type entities scanned.
    pub recency_window: usize,
    pub strategy: MergeStrategy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            recency_window: 200,
            strategy: MergeStrategy::TargetWins,
        }
    }
}

impl MergeConfig {
    /// Create a merge config with custom threshold.
    pub fn with_threshold(similarity_threshold: f64) -> Self {
        Self {
            similarity_threshold,
            ..Default::default()
        }
    }
}

/// Main graphmind configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphMindConfig {
    pub graph_store: GraphStoreConfig,
    pub llm: LlmConfig,
    pub generator: GeneratorConfig,
    pub validator: ValidatorConfig,
    pub resolver: ResolverConfig,
    pub merge: MergeConfig,
    /// SQLite file backing the entity directory.
    pub directory_path: PathBuf,
    /// Prefix of per-user graph names.
    pub namespace_prefix: String,
    /// Redis URL for the resolution cache; in-process when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_url: Option<String>,
    /// Query vocabulary file (.toml, .json or .yaml); built-in tables when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocabulary_path: Option<PathBuf>,
}

impl Default for GraphMindConfig {
    fn default() -> Self {
        let data_dir = dirs::home_dir()
            .map(|h| h.join(".graphmind"))
            .unwrap_or_else(|| PathBuf::from(".graphmind"));

        Self {
            graph_store: GraphStoreConfig::default(),
            llm: LlmConfig::default(),
            generator: GeneratorConfig::default(),
            validator: ValidatorConfig::default(),
            resolver: ResolverConfig::default(),
            merge: MergeConfig::default(),
            directory_path: data_dir.join("directory.db"),
            namespace_prefix: "graphmind_".to_string(),
            cache_url: None,
            vocabulary_path: None,
        }
    }
}

impl GraphMindConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> GraphMindResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| GraphMindError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| GraphMindError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| GraphMindError::Configuration(e.to_string())),
            _ => Err(GraphMindError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Graph store
        if let Ok(url) = std::env::var("FALKORDB_URL") {
            config.graph_store.url = url;
        } else if let Ok(host) = std::env::var("FALKORDB_HOST") {
            let port = std::env::var("FALKORDB_PORT").unwrap_or_else(|_| "6379".to_string());
            config.graph_store.url = format!("redis://{}:{}", host, port);
        }
        if let Ok(user) = std::env::var("FALKORDB_USER") {
            config.graph_store.username = Some(user);
        }
        if let Ok(password) = std::env::var("FALKORDB_PASSWORD") {
            config.graph_store.password = Some(password);
        }

        // Model provider
        if let Ok(provider) = std::env::var("GRAPHMIND_LLM_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "openai" | "openai_compatible" => {
                    config.llm.provider = LlmProvider::OpenAiCompatible
                }
                _ => config.llm.provider = LlmProvider::WorkersAi,
            }
        }
        if let Ok(account) = std::env::var("CLOUDFLARE_ACCOUNT_ID") {
            config.llm.account_id = Some(account);
        }
        if let Ok(token) = std::env::var("CLOUDFLARE_API_TOKEN") {
            config.llm.api_key = Some(token);
        }
        if let Ok(url) = std::env::var("GRAPHMIND_LLM_BASE_URL") {
            config.llm.base_url = Some(url);
        }
        if let Ok(model) = std::env::var("GRAPHMIND_FAST_MODEL") {
            config.generator.fast.model_id = model;
        }
        if let Ok(model) = std::env::var("GRAPHMIND_LARGE_MODEL") {
            config.generator.large.model_id = model;
        }

        // Storage
        if let Ok(path) = std::env::var("GRAPHMIND_DIRECTORY_PATH") {
            config.directory_path = PathBuf::from(path);
        }
        if let Ok(prefix) = std::env::var("GRAPHMIND_NAMESPACE_PREFIX") {
            config.namespace_prefix = prefix;
        }
        if let Ok(url) = std::env::var("GRAPHMIND_CACHE_URL") {
            config.cache_url = Some(url);
        }
        if let Ok(path) = std::env::var("GRAPHMIND_VOCABULARY_PATH") {
            config.vocabulary_path = Some(PathBuf::from(path));
        }

        config
    }

    /// Graph name for a user under the configured prefix.
    pub fn namespace_for(&self, user_id: &str) -> String {
        user_namespace(&self.namespace_prefix, user_id)
    }
}

/// `prefix` plus the user id with anything outside `[A-Za-z0-9_-]`
/// replaced by `_`.
pub fn user_namespace(prefix: &str, user_id: &str) -> String {
    let sanitized: String = user_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{}{}", prefix, sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = GraphMindConfig::default();
        assert_eq!(config.validator.max_limit, 100);
        assert_eq!(config.generator.fast.timeout_ms, 3_000);
        assert_eq!(config.generator.large.timeout_ms, 5_000);
        assert_eq!(config.resolver.max_edit_distance, 2);
        assert!((config.merge.similarity_threshold - 0.85).abs() < f64::EPSILON);
    }

    #[test]
    fn test_namespace_for_sanitizes() {
        let config = GraphMindConfig::default();
        assert_eq!(config.namespace_for("user-42"), "graphmind_user-42");
        assert_eq!(config.namespace_for("a b/c"), "graphmind_a_b_c");
    }

    #[test]
    fn test_from_toml_partial_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "namespace_prefix = \"tenant_\"\nvocabulary_path = \"/etc/graphmind/vocabulary.yaml\"\n[validator]\nmax_limit = 25\n[merge]\nstrategy = \"source_wins\""
        )
        .unwrap();

        let config = GraphMindConfig::from_file(file.path()).unwrap();
        assert_eq!(config.namespace_prefix, "tenant_");
        assert_eq!(
            config.vocabulary_path.as_deref(),
            Some(std::path::Path::new("/etc/graphmind/vocabulary.yaml"))
        );
        assert_eq!(config.validator.max_limit, 25);
        assert_eq!(config.validator.default_limit, 50);
        assert_eq!(config.merge.strategy, MergeStrategy::SourceWins);
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = GraphMindConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, GraphMindError::Configuration(_)));
    }
}
