//! Routing tests for the full question pipeline with in-memory collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use graphmind_core::{
    CanonicalEntity, EntityDirectory, GraphMindConfig, GraphMindError, GraphMindResult, GraphNode,
    GraphRows, GraphStatement, GraphStore, GraphValue, ModelRequest, ModelRunner, ResultShape,
    TemplateTag,
};
use graphmind_query::{QueryPipeline, QueryVocabulary};

struct MemoryDirectory {
    entities: Vec<CanonicalEntity>,
}

#[async_trait]
impl EntityDirectory for MemoryDirectory {
    async fn search(&self, user_id: &str, name_like: &str, limit: usize) -> GraphMindResult<Vec<CanonicalEntity>> {
        let needle = name_like.to_lowercase();
        Ok(self
            .entities
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| e.aliases.iter().any(|a| a.to_lowercase().contains(&needle)))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list(&self, user_id: &str, entity_type: Option<&str>, limit: usize) -> GraphMindResult<Vec<CanonicalEntity>> {
        Ok(self
            .entities
            .iter()
            .filter(|e| e.user_id == user_id)
            .filter(|e| entity_type.map_or(true, |t| e.entity_type == t))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get(&self, user_id: &str, entity_key: &str) -> GraphMindResult<Option<CanonicalEntity>> {
        Ok(self
            .entities
            .iter()
            .find(|e| e.user_id == user_id && e.entity_key == entity_key)
            .cloned())
    }

    async fn upsert(&self, _entity: &CanonicalEntity) -> GraphMindResult<()> {
        Ok(())
    }

    async fn delete(&self, _user_id: &str, _entity_key: &str) -> GraphMindResult<bool> {
        Ok(false)
    }
}

/// Always answers with the same text and counts calls.
struct FixedRunner {
    reply: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl ModelRunner for FixedRunner {
    async fn run(&self, _model_id: &str, _request: &ModelRequest) -> GraphMindResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }

    fn provider_name(&self) -> &str {
        "fixed"
    }
}

/// Returns canned rows and records what it was asked to run.
struct RecordingStore {
    rows: GraphRows,
    seen: Mutex<Vec<(String, GraphStatement)>>,
}

#[async_trait]
impl GraphStore for RecordingStore {
    async fn execute(&self, _namespace: &str, _statement: &GraphStatement) -> GraphMindResult<GraphRows> {
        Err(GraphMindError::graph_store("writes are not expected here"))
    }

    async fn execute_read_only(&self, namespace: &str, statement: &GraphStatement) -> GraphMindResult<GraphRows> {
        self.seen
            .lock()
            .unwrap()
            .push((namespace.to_string(), statement.clone()));
        Ok(self.rows.clone())
    }
}

const USER: &str = "user-1";

fn setup(reply: &'static str) -> (QueryPipeline, Arc<FixedRunner>) {
    let directory = Arc::new(MemoryDirectory {
        entities: vec![
            CanonicalEntity::new(USER, "Sarah", "Person"),
            CanonicalEntity::new(USER, "GraphMind", "Project"),
            CanonicalEntity::new("someone-else", "Sara", "Person"),
        ],
    });
    let runner = Arc::new(FixedRunner {
        reply,
        calls: AtomicUsize::new(0),
    });
    let pipeline = QueryPipeline::from_config(
        &GraphMindConfig::default(),
        Arc::new(QueryVocabulary::default()),
        directory,
        runner.clone(),
        None,
    );
    (pipeline, runner)
}

#[tokio::test]
async fn test_entity_lookup_uses_resolved_type() {
    let (pipeline, runner) = setup("MATCH (n) RETURN n LIMIT 1");
    let query = pipeline.generate("Who is Sarah?", USER).await.unwrap();

    assert_eq!(query.template_used, TemplateTag::EntityLookup);
    assert_eq!(query.statement, "MATCH (n:Person {name: $name}) RETURN n LIMIT 1");
    assert_eq!(query.parameters["name"], "Sarah");
    assert_eq!(query.namespace, "graphmind_user-1");
    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_misspelling_resolves_to_canonical_name() {
    let (pipeline, _) = setup("MATCH (n) RETURN n LIMIT 1");
    let query = pipeline.generate("Tell me about Graphmnd", USER).await.unwrap();
    assert_eq!(query.statement, "MATCH (n:Project {name: $name}) RETURN n LIMIT 1");
    assert_eq!(query.parameters["name"], "GraphMind");
}

#[tokio::test]
async fn test_relationship_question() {
    let (pipeline, _) = setup("MATCH (n) RETURN n LIMIT 1");
    let query = pipeline.generate("What projects did Sarah work on?", USER).await.unwrap();
    assert_eq!(query.template_used, TemplateTag::RelationshipQuery);
    assert_eq!(
        query.statement,
        "MATCH (a:Person {name: $name})-[r:WORKS_ON]->(b:Project) RETURN a, r, b LIMIT 100"
    );
}

#[tokio::test]
async fn test_templates_without_entities() {
    let (pipeline, runner) = setup("MATCH (n) RETURN n LIMIT 1");

    let temporal = pipeline.generate("What did I do last week?", USER).await.unwrap();
    assert_eq!(temporal.template_used, TemplateTag::TemporalQuery);
    assert!(temporal.parameters.contains_key("since"));

    let count = pipeline.generate("How many projects?", USER).await.unwrap();
    assert_eq!(
        count.statement,
        "MATCH (n:Project) RETURN count(n) AS count, $label AS label LIMIT 1"
    );

    let list = pipeline.generate("List all projects", USER).await.unwrap();
    assert_eq!(list.template_used, TemplateTag::ListQuery);

    assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_entity_question_without_reference_goes_to_model() {
    let (pipeline, runner) = setup("MATCH (p:Person) RETURN p LIMIT 5");
    let query = pipeline.generate("who is the newest hire?", USER).await.unwrap();
    assert_eq!(query.template_used, TemplateTag::LlmGenerate);
    assert_eq!(query.namespace, "graphmind_user-1");
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_compound_question_goes_to_model() {
    let (pipeline, runner) = setup("MATCH (p:Person) RETURN p LIMIT 5");
    let query = pipeline
        .generate("Find people who know about Python and attended meetings last month", USER)
        .await
        .unwrap();
    assert_eq!(query.template_used, TemplateTag::LlmGenerate);
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_model_failure_surfaces_fixed_error() {
    let (pipeline, runner) = setup("DROP GRAPH everything");
    let err = pipeline
        .generate("Which technologies overlap between teams?", USER)
        .await
        .unwrap_err();
    assert!(matches!(err, GraphMindError::QueryGeneration { .. }));
    assert!(err.is_retryable());
    assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_question_rejected() {
    let (pipeline, _) = setup("MATCH (n) RETURN n LIMIT 1");
    assert!(pipeline.generate("   ", USER).await.is_err());
}

#[tokio::test]
async fn test_answer_runs_read_only_in_user_namespace() {
    let (pipeline, _) = setup("MATCH (n) RETURN n LIMIT 1");
    let sarah = GraphValue::Node(GraphNode::new(7, vec!["Person".into()]).with_property("name", "Sarah"));
    let store = RecordingStore {
        rows: GraphRows::new(vec!["n".into()], vec![vec![sarah]]),
        seen: Mutex::new(Vec::new()),
    };

    let (query, result) = pipeline.answer(&store, "Who is Sarah?", USER).await.unwrap();

    let seen = store.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "graphmind_user-1");
    assert_eq!(seen[0].1.text, query.statement);
    assert_eq!(seen[0].1.parameters["name"], "Sarah");
    assert_eq!(result.metadata.shape, ResultShape::Generic);
    assert_eq!(result.entities[0].name, "Sarah");
}
