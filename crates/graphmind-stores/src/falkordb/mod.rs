//! FalkorDB graph store over the Redis protocol.
//!
//! Each namespace is one FalkorDB graph. Reads go through `GRAPH.RO_QUERY`,
//! which the server refuses to run if the statement writes; everything else
//! goes through `GRAPH.QUERY`.

pub mod decode;
pub mod params;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, IntoConnectionInfo, Value as RedisValue};
use tracing::debug;

use graphmind_core::error::{GraphMindError, GraphMindResult};
use graphmind_core::traits::{GraphStatement, GraphStore, GraphStoreConfig};
use graphmind_core::types::GraphRows;

const QUERY: &str = "GRAPH.QUERY";
const READ_ONLY_QUERY: &str = "GRAPH.RO_QUERY";

/// Graph names are used verbatim as Redis keys.
fn check_namespace(namespace: &str) -> GraphMindResult<()> {
    if namespace.is_empty()
        || !namespace
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(GraphMindError::validation(format!(
            "Invalid graph namespace {:?}",
            namespace
        )));
    }
    Ok(())
}

/// FalkorDB graph store.
pub struct FalkorDbStore {
    connection: MultiplexedConnection,
}

impl FalkorDbStore {
    /// Connect using the configured URL, with credentials from the config
    /// taking precedence over any in the URL.
    pub async fn new(config: GraphStoreConfig) -> GraphMindResult<Self> {
        let mut info = config
            .url
            .as_str()
            .into_connection_info()
            .map_err(|e| GraphMindError::graph_store(format!("Invalid FalkorDB URL: {}", e)))?;
        if config.username.is_some() {
            info.redis.username = config.username.clone();
        }
        if config.password.is_some() {
            info.redis.password = config.password.clone();
        }

        let client = Client::open(info)
            .map_err(|e| GraphMindError::graph_store(format!("Failed to create FalkorDB client: {}", e)))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| GraphMindError::graph_store(format!("Failed to connect to FalkorDB: {}", e)))?;

        Ok(Self { connection })
    }

    async fn query(
        &self,
        command: &'static str,
        namespace: &str,
        statement: &GraphStatement,
    ) -> GraphMindResult<GraphRows> {
        check_namespace(namespace)?;
        let text = params::render(statement)?;

        let mut conn = self.connection.clone();
        let reply: RedisValue = redis::cmd(command)
            .arg(namespace)
            .arg(&text)
            .query_async(&mut conn)
            .await
            .map_err(|e| GraphMindError::graph_store(format!("{} failed: {}", command, e)))?;

        let rows = decode::decode_reply(&reply)?;
        debug!(
            command,
            rows = rows.len(),
            execution_time_ms = rows.stats.execution_time_ms,
            "Graph statement executed"
        );
        Ok(rows)
    }

    /// Names of every graph on the server.
    pub async fn list_graphs(&self) -> GraphMindResult<Vec<String>> {
        let mut conn = self.connection.clone();
        redis::cmd("GRAPH.LIST")
            .query_async(&mut conn)
            .await
            .map_err(|e| GraphMindError::graph_store(format!("GRAPH.LIST failed: {}", e)))
    }

    /// Drop a whole graph.
    pub async fn delete_graph(&self, namespace: &str) -> GraphMindResult<()> {
        check_namespace(namespace)?;
        let mut conn = self.connection.clone();
        let _: RedisValue = redis::cmd("GRAPH.DELETE")
            .arg(namespace)
            .query_async(&mut conn)
            .await
            .map_err(|e| GraphMindError::graph_store(format!("GRAPH.DELETE failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl GraphStore for FalkorDbStore {
    async fn execute(&self, namespace: &str, statement: &GraphStatement) -> GraphMindResult<GraphRows> {
        self.query(QUERY, namespace, statement).await
    }

    async fn execute_read_only(
        &self,
        namespace: &str,
        statement: &GraphStatement,
    ) -> GraphMindResult<GraphRows> {
        self.query(READ_ONLY_QUERY, namespace, statement).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_check() {
        assert!(check_namespace("graphmind_user-1").is_ok());
        assert!(check_namespace("").is_err());
        assert!(check_namespace("a b").is_err());
        assert!(check_namespace("g\"; FLUSHALL").is_err());
    }
}
