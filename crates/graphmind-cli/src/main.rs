//! graphmind command-line interface.
//!
//! Generates, validates and runs graph queries for a user, and exposes the
//! duplicate scan and merge operations of the entity directory.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use graphmind_core::config::GraphMindConfig;
use graphmind_core::error::GraphMindError;
use graphmind_entity::{
    calculate_similarity, levenshtein_similarity, normalize_name, rank_candidates,
    token_similarity, EntityMergeEngine,
};
use graphmind_llm::RunnerFactory;
use graphmind_query::{QueryPipeline, QueryValidator, QueryVocabulary, ValidationContext};
use graphmind_stores::StoreFactory;

#[derive(Parser)]
#[command(name = "graphmind")]
#[command(author, version, about = "Natural-language questions over per-user knowledge graphs")]
struct Cli {
    /// Configuration file (.toml, .json or .yaml). Environment otherwise.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn a question into a graph query, optionally running it.
    Ask {
        question: String,

        #[arg(long)]
        user: String,

        /// Execute read-only against FalkorDB and print the formatted result.
        #[arg(long)]
        execute: bool,

        /// Query vocabulary file, overriding `vocabulary_path` from config.
        #[arg(long)]
        vocabulary: Option<PathBuf>,
    },

    /// Check a statement against the safety rules.
    Validate {
        statement: String,

        /// Trim, drop a trailing `;` and add a default LIMIT before checking.
        #[arg(long)]
        sanitize: bool,

        /// Namespace the statement will run in.
        #[arg(long)]
        namespace: Option<String>,
    },

    /// Score two entity names.
    Similarity { a: String, b: String },

    /// List likely duplicates of a directory entity.
    Duplicates {
        #[arg(long)]
        user: String,

        #[arg(long)]
        key: String,
    },

    /// Merge the `source` entity into `target`.
    Merge {
        #[arg(long)]
        user: String,

        #[arg(long)]
        source: String,

        #[arg(long)]
        target: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays parseable JSON.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<GraphMindError>() {
                Some(err) => eprintln!("error [{}]: {}", err.code().as_str(), err),
                None => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<GraphMindConfig> {
    match path {
        Some(path) => GraphMindConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(GraphMindConfig::from_env()),
    }
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ask {
            question,
            user,
            execute,
            vocabulary,
        } => {
            let mut config = load_config(cli.config.as_ref())?;
            if vocabulary.is_some() {
                config.vocabulary_path = vocabulary;
            }
            let vocabulary = QueryVocabulary::from_config(&config)?;
            let runner = RunnerFactory::create(config.llm.clone())?;
            let (directory, cache) = StoreFactory::from_config(&config).await?;
            let pipeline = QueryPipeline::from_config(
                &config,
                Arc::new(vocabulary),
                directory,
                runner,
                Some(cache),
            );

            if execute {
                let store = StoreFactory::graph_store(&config.graph_store).await?;
                let (query, result) = pipeline.answer(store.as_ref(), &question, &user).await?;
                print_json(&json!({ "query": query, "result": result }))
            } else {
                let query = pipeline.generate(&question, &user).await?;
                print_json(&serde_json::to_value(&query)?)
            }
        }

        Commands::Validate {
            statement,
            sanitize,
            namespace,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let validator = QueryValidator::new(config.validator.clone());
            let mut context = if sanitize {
                ValidationContext::sanitize()
            } else {
                ValidationContext::validate()
            };
            if let Some(namespace) = namespace {
                context = context.in_namespace(namespace);
            }

            match validator.validate(&statement, &Map::new(), &context) {
                Ok(validated) => print_json(&json!({
                    "valid": true,
                    "statement": validated.statement,
                    "modified": validated.modified,
                })),
                Err(e) => {
                    print_json(&json!({
                        "valid": false,
                        "category": e.category,
                        "message": e.message,
                        "fixable": e.is_fixable(),
                        "blocked": e.is_blocked(),
                    }))?;
                    Err(GraphMindError::from(e).into())
                }
            }
        }

        Commands::Similarity { a, b } => {
            let (a_norm, b_norm) = (normalize_name(&a), normalize_name(&b));
            print_json(&json!({
                "similarity": calculate_similarity(&a, &b),
                "token": token_similarity(&a_norm, &b_norm),
                "character": levenshtein_similarity(&a_norm, &b_norm),
            }))
        }

        Commands::Duplicates { user, key } => {
            let config = load_config(cli.config.as_ref())?;
            let directory = StoreFactory::directory(&config.directory_path)?;
            let entity = directory
                .get(&user, &key)
                .await?
                .ok_or_else(|| GraphMindError::entity_not_found(key.as_str()))?;

            let recent = directory
                .list(&user, Some(&entity.entity_type), config.merge.recency_window)
                .await?;
            let candidates = rank_candidates(&entity, &recent, config.merge.similarity_threshold);
            info!(entity = %key, found = candidates.len(), "Duplicate scan complete");
            print_json(&serde_json::to_value(&candidates)?)
        }

        Commands::Merge {
            user,
            source,
            target,
        } => {
            let config = load_config(cli.config.as_ref())?;
            let graph = StoreFactory::graph_store(&config.graph_store).await?;
            let directory = StoreFactory::directory(&config.directory_path)?;
            let engine = EntityMergeEngine::new(graph, directory, config.merge.clone());

            let namespace = config.namespace_for(&user);
            let report = engine.merge(&namespace, &user, &source, &target).await?;
            print_json(&serde_json::to_value(&report)?)
        }
    }
}
