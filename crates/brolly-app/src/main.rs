//! Brolly application binary - composition root.
//!
//! Ties together all Brolly crates into a single executable:
//! 1. Load configuration from TOML
//! 2. Select an embedding backend (ONNX when configured, mock otherwise)
//! 3. `ingest`: chunk, embed, and index a directory of policy documents
//! 4. `chat` / `ask`: load the persisted index and answer questions through
//!    the retrieval-grounded orchestrator with session memory

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use uuid::Uuid;

use brolly_chat::{AnswerOrchestrator, ChatEngine, ChatReply, MockLlm, SessionStore};
use brolly_core::config::BrollyConfig;
use brolly_core::PolicyType;
use brolly_vector::{
    build_index, load_documents, save_artifacts, DynEmbeddingService, MockEmbedding,
    OnnxEmbeddingService, RetrieverInit,
};

use cli::{CliArgs, Command};

/// Select the embedding backend from config.
///
/// Index artifacts and queries must share one embedding space, so every
/// subcommand runs this same selection: the ONNX model when both paths are
/// configured and loadable, the deterministic mock otherwise.
fn embedding_backend(config: &BrollyConfig) -> Box<dyn DynEmbeddingService> {
    if let (Some(model), Some(tokenizer)) = (
        config.embedding.model_path.as_deref(),
        config.embedding.tokenizer_path.as_deref(),
    ) {
        match OnnxEmbeddingService::from_files(Path::new(model), Path::new(tokenizer)) {
            Ok(service) => return Box::new(service),
            Err(e) => {
                tracing::warn!(error = %e, "ONNX embedding unavailable, using mock embeddings");
            }
        }
    }
    Box::new(MockEmbedding::new())
}

/// Wire a chat engine from config: retriever, orchestrator, session store.
fn build_engine(config: &BrollyConfig) -> ChatEngine {
    let embedding = embedding_backend(config);
    let data_dir = Path::new(&config.general.data_dir);
    let retriever = RetrieverInit::load(data_dir, &config.retrieval.index_name, embedding);
    if let Some(reason) = retriever.unavailable_reason() {
        tracing::warn!(reason, "Similarity index unavailable, answers will not be grounded");
    }

    if config.llm.model != "mock" {
        tracing::warn!(
            model = %config.llm.model,
            "Unknown model selector, using the mock backend"
        );
    }
    let orchestrator = AnswerOrchestrator::new(Box::new(MockLlm::new()), &config.llm);
    let store = SessionStore::new(config.memory.expiry_hours);

    ChatEngine::new(
        retriever,
        orchestrator,
        store,
        config.retrieval.k,
        config.memory.max_recent,
    )
}

/// Build and persist the index from a directory of policy documents.
async fn ingest(
    config: &BrollyConfig,
    docs: &Path,
    out: Option<PathBuf>,
    index_name: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let documents = load_documents(docs)?;
    if documents.is_empty() {
        tracing::warn!(dir = %docs.display(), "No policy documents found, nothing to index");
        return Ok(());
    }

    let embedding = embedding_backend(config);
    let build = build_index(
        &documents,
        embedding.as_ref(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap,
    )
    .await?;

    let out_dir = out.unwrap_or_else(|| PathBuf::from(&config.general.data_dir));
    let name = index_name.unwrap_or_else(|| config.retrieval.index_name.clone());
    save_artifacts(&build, &out_dir, &name)?;

    println!(
        "Indexed {} documents ({} chunks) into {}",
        documents.len(),
        build.records.len(),
        out_dir.display()
    );
    Ok(())
}

/// Hourly session sweep, run as a background task for the lifetime of the REPL.
async fn sweep_loop(engine: Arc<ChatEngine>) {
    let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
    loop {
        interval.tick().await;
        match engine.sweep_sessions() {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Expired sessions swept"),
            Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
        }
    }
}

fn print_reply(reply: &ChatReply) {
    println!("\n{}\n", reply.answer.trim());
    if reply.supporting_info.chunk_count > 0 {
        println!(
            "  [{} | {} chunks from: {}]",
            reply.mode,
            reply.supporting_info.chunk_count,
            reply.supporting_info.document_ids.join(", ")
        );
    }
    for suggestion in &reply.suggestions {
        println!("  -> {}", suggestion.reason);
    }
}

/// Interactive REPL threading one session across turns.
async fn run_chat(
    config: &BrollyConfig,
    session: Option<Uuid>,
    type_filter: Option<PolicyType>,
    region: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(build_engine(config));
    tokio::spawn(sweep_loop(Arc::clone(&engine)));

    println!("Brolly policy chat. Ask about your policies; 'exit' or 'quit' leaves.");
    if !engine.retriever_ready() {
        println!("(no index loaded; run `brolly ingest` first for grounded answers)");
    }

    let mut session = session;
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("you> ");
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
            break;
        }

        match engine.chat(session, query, type_filter, region).await {
            Ok(reply) => {
                // The store mints a fresh id when the given one is expired or
                // unknown; print the id whenever it changes.
                if session != Some(reply.session_id) {
                    println!("[session {}]", reply.session_id);
                    session = Some(reply.session_id);
                }
                print_reply(&reply);
            }
            Err(e) => tracing::error!(error = %e, "Turn failed"),
        }
    }

    Ok(())
}

/// One-shot question with no session continuity.
async fn run_ask(
    config: &BrollyConfig,
    query: &str,
    type_filter: Option<PolicyType>,
    region: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine(config);
    let reply = engine.chat(None, query, type_filter, region).await?;
    print_reply(&reply);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = BrollyConfig::load_or_default(&config_file);

    // Tracing. RUST_LOG wins; otherwise the CLI flag, then the config level.
    let fallback_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback_level)),
        )
        .init();

    tracing::info!("Starting Brolly v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(config = %config_file.display(), "Configuration path resolved");

    match args.command {
        Command::Ingest {
            docs,
            out,
            index_name,
        } => ingest(&config, &docs, out, index_name).await,
        Command::Chat {
            session,
            policy_type,
            region,
        } => run_chat(&config, session, policy_type, region.as_deref()).await,
        Command::Ask {
            query,
            policy_type,
            region,
        } => run_ask(&config, &query, policy_type, region.as_deref()).await,
    }
}
