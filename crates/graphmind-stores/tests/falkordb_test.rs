//! Integration tests for FalkorDbStore.
//!
//! These tests require a running FalkorDB instance.
//! Set FALKORDB_URL to run them.
//!
//! Example:
//! ```bash
//! FALKORDB_URL="redis://localhost:6379" cargo test -p graphmind-stores -- --ignored
//! ```

use graphmind_core::{GraphMindResult, GraphStatement, GraphStore, GraphStoreConfig, GraphValue};
use graphmind_stores::FalkorDbStore;

fn get_test_url() -> Option<String> {
    std::env::var("FALKORDB_URL").ok()
}

fn test_graph_name() -> String {
    format!("graphmind_test_{}", std::process::id())
}

#[tokio::test]
#[ignore] // Requires FalkorDB
async fn test_write_read_and_cleanup() -> GraphMindResult<()> {
    let url = match get_test_url() {
        Some(url) => url,
        None => return Ok(()),
    };
    let store = FalkorDbStore::new(GraphStoreConfig {
        url,
        ..Default::default()
    })
    .await?;
    let graph = test_graph_name();

    let created = store
        .execute(
            &graph,
            &GraphStatement::new(
                "CREATE (a:Person {name: $alice})-[:WORKS_ON {role: 'Lead'}]->(p:Project {name: $project})",
            )
            .param("alice", "Alice")
            .param("project", "GraphMind"),
        )
        .await?;
    assert_eq!(created.stats.nodes_created, 2);
    assert_eq!(created.stats.relationships_created, 1);

    let rows = store
        .execute_read_only(
            &graph,
            &GraphStatement::new("MATCH (a:Person {name: $name})-[r]->(p) RETURN a, r, p LIMIT 10")
                .param("name", "Alice"),
        )
        .await?;
    assert_eq!(rows.len(), 1);
    assert!(matches!(rows.get(0, "a"), Some(GraphValue::Node(_))));
    assert!(matches!(rows.get(0, "r"), Some(GraphValue::Relationship(_))));

    // The read-only command refuses writes.
    let refused = store
        .execute_read_only(&graph, &GraphStatement::new("MATCH (n) DETACH DELETE n"))
        .await;
    assert!(refused.is_err());

    assert!(store.list_graphs().await?.contains(&graph));
    store.delete_graph(&graph).await?;
    assert!(!store.list_graphs().await?.contains(&graph));
    Ok(())
}
