#![deny(unused)]
//! Paralegal - multi-agent legal and tax question answering
//!
//! Routes a question through a fixed group of agents (router, tax triage,
//! reformulation, retrieval, synthesis) and prints the cited answer.

use anyhow::{Context, Result};
use clap::Parser;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use paralegal_controller::DriverBuilder;
use paralegal_core::config::{AppConfig, RetrievalBackend, SessionBackend, SessionConfig};
use paralegal_core::traits::{LlmClient, Retriever, SessionStore};
use paralegal_store::{
    FileSessionStore, InMemorySessionStore, QdrantRetriever, RedisSessionStore, SessionCache,
    SimpleVectorStore,
};

use crate::cli::{Cli, Commands, SessionCommand};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_from(&cli.config_dir).context("Failed to load configuration")?;
    paralegal_governance::configure_tracing(&config.telemetry)?;
    let metrics = if config.telemetry.metrics {
        Some(paralegal_governance::setup_metrics_recorder()?)
    } else {
        None
    };

    tracing::info!("Starting paralegal v{}", env!("CARGO_PKG_VERSION"));

    // =========================================================================
    // Session Cache
    // =========================================================================
    let store = build_session_store(&config.session)?;
    let cache = Arc::new(
        SessionCache::new(store)
            .with_bound(config.orchestrator.history_bound)
            .with_ttl(config.session.ttl_secs),
    );

    let mut failed = false;
    match cli.command {
        Commands::Ask {
            query,
            session,
            brief,
        } => {
            let query = query.join(" ");
            anyhow::ensure!(!query.trim().is_empty(), "Question must not be empty");

            let llm: Arc<dyn LlmClient> = Arc::new(
                paralegal_model_gateway::create_client_from_config(&config.model_gateway)?,
            );
            let retriever = build_retriever(&config, llm.clone(), cli.corpus.as_deref()).await?;

            let driver = DriverBuilder::new()
                .with_config(config.orchestrator.clone())
                .with_llm(llm)
                .with_retriever(retriever)
                .with_cache(cache)
                .build()?;

            let answer = match session {
                Some(id) => driver.run(&query, &id).await,
                None => driver.ask(&query).await,
            };

            if brief {
                println!("{}", answer.message);
            } else {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            }
            failed = answer.is_error();
        }

        Commands::Search { text, top_k } => {
            let text = text.join(" ");
            let llm: Arc<dyn LlmClient> = Arc::new(
                paralegal_model_gateway::create_client_from_config(&config.model_gateway)?,
            );
            let retriever = build_retriever(&config, llm, cli.corpus.as_deref()).await?;

            let top_k = top_k.unwrap_or(config.orchestrator.retrieval_top_k);
            let hits = retriever.search(&text, top_k).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }

        Commands::Session { cmd } => match cmd {
            SessionCommand::List => {
                for id in cache.list().await? {
                    println!("{}", id);
                }
            }
            SessionCommand::Show { id } => {
                let history = cache.get(&id).await?;
                println!("{}", serde_json::to_string_pretty(&history)?);
            }
            SessionCommand::Clear { id } => {
                cache.clear(&id).await?;
                tracing::info!(session_id = %id, "Session cleared");
            }
        },
    }

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }
    if failed {
        std::process::exit(1);
    }
    Ok(())
}

fn build_session_store(config: &SessionConfig) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match config.backend {
        SessionBackend::Memory => {
            tracing::info!("Initializing In-Memory Session Store");
            Arc::new(InMemorySessionStore::new())
        }
        SessionBackend::File => {
            tracing::info!(dir = %config.cache_dir, "Initializing File Session Store");
            Arc::new(FileSessionStore::new(&config.cache_dir)?)
        }
        SessionBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .context("session.redis_url is required for the redis backend")?;
            tracing::info!(url = %url, "Initializing Redis Session Store");
            Arc::new(RedisSessionStore::new(url, "paralegal:session", config.ttl_secs)?)
        }
    };
    Ok(store)
}

async fn build_retriever(
    config: &AppConfig,
    embedder: Arc<dyn LlmClient>,
    corpus: Option<&Path>,
) -> Result<Arc<dyn Retriever>> {
    let retrieval = &config.retrieval;
    match retrieval.backend {
        RetrievalBackend::Qdrant => {
            tracing::info!(url = %retrieval.url, collection = %retrieval.collection, "Connecting to Qdrant");
            let qdrant = QdrantRetriever::new(
                &retrieval.url,
                &retrieval.collection,
                retrieval.vector_size,
                embedder,
            )
            .await?;
            Ok(Arc::new(qdrant))
        }
        RetrievalBackend::Memory => {
            let store = SimpleVectorStore::new(embedder);
            if let Some(dir) = corpus {
                let indexed = load_corpus(&store, dir).await?;
                tracing::info!(documents = indexed, dir = %dir.display(), "Corpus indexed");
            } else {
                tracing::warn!("In-memory corpus is empty; pass --corpus to index documents");
            }
            Ok(Arc::new(store))
        }
    }
}

/// Index every `.txt` and `.md` file in `dir` as one document.
async fn load_corpus(store: &SimpleVectorStore, dir: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to read corpus directory {}", dir.display()))?;

    let mut indexed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_text = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt") | Some("md")
        );
        if !is_text {
            continue;
        }

        let content = tokio::fs::read_to_string(&path).await?;
        let doc_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut metadata = HashMap::new();
        metadata.insert("document_id".to_string(), doc_id.clone());
        metadata.insert("page".to_string(), "1".to_string());
        store.add_document(&doc_id, &content, metadata).await?;
        indexed += 1;
    }
    Ok(indexed)
}
