//! Graph store trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::GraphMindResult;
use crate::types::{GeneratedQuery, GraphRows};

/// A statement plus its named parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphStatement {
    pub text: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl GraphStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Map::new(),
        }
    }

    pub fn param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }
}

impl From<&GeneratedQuery> for GraphStatement {
    fn from(query: &GeneratedQuery) -> Self {
        Self {
            text: query.statement.clone(),
            parameters: query.parameters.clone(),
        }
    }
}

/// Core GraphStore trait - all graph store backends implement this.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Execute one statement in a namespace (one graph per user).
    async fn execute(&self, namespace: &str, statement: &GraphStatement) -> GraphMindResult<GraphRows>;

    /// Execute a statement that must not write. Backends with a read-only
    /// mode enforce it; the default just executes.
    async fn execute_read_only(
        &self,
        namespace: &str,
        statement: &GraphStatement,
    ) -> GraphMindResult<GraphRows> {
        self.execute(namespace, statement).await
    }

    /// Execute statements in order, stopping at the first failure.
    /// Earlier statements are not rolled back.
    async fn execute_batch(
        &self,
        namespace: &str,
        statements: &[GraphStatement],
    ) -> GraphMindResult<Vec<GraphRows>> {
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            results.push(self.execute(namespace, statement).await?);
        }
        Ok(results)
    }
}

/// Graph store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    /// Provider type.
    pub provider: GraphStoreProvider,
    /// Connection URL.
    pub url: String,
    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            provider: GraphStoreProvider::FalkorDb,
            url: "redis://localhost:6379".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Graph store provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphStoreProvider {
    #[default]
    FalkorDb,
}
