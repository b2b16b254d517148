//! The demonstration CLI (spec §6.6): ingest a directory of `.txt` files
//! into a disk-backed engine, and run queries against it. Out of scope for
//! the core itself — this is the demonstration collaborator spec.md §1
//! explicitly excludes from the core's responsibility.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use searchcore::config::EngineConfig;
use searchcore::engine::{Engine, ForwardRecordRequest};
use searchcore::storage::disk::DiskStorage;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "searchcore-cli", about = "A small full-text search engine", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest every `.txt` file under a directory as one document each.
    Add {
        /// Directory to walk for `.txt` files.
        #[arg(long)]
        dir: PathBuf,

        /// Directory the disk-backed store lives in (created if missing).
        #[arg(long)]
        store: PathBuf,
    },

    /// Run a query against a disk-backed store.
    Search {
        /// Directory the disk-backed store lives in.
        #[arg(long)]
        store: PathBuf,

        /// Query text.
        #[arg(long)]
        query: String,

        /// Maximum number of hits to print.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Add { dir, store } => run_add(&dir, &store).await,
        Command::Search { store, query, limit } => run_search(&store, &query, limit).await,
    }
}

async fn open_engine(store: &PathBuf) -> anyhow::Result<Engine<DiskStorage>> {
    let config = EngineConfig::default();
    let storage = DiskStorage::open(store, &config.store, 256).await?;
    Ok(Engine::new(storage, config))
}

async fn run_add(dir: &PathBuf, store: &PathBuf) -> anyhow::Result<()> {
    let engine = open_engine(store).await?;
    let mut rank = 0u32;

    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }

        let title = entry
            .path()
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("untitled")
            .to_string();
        let text = tokio::fs::read_to_string(entry.path()).await?;
        let url = format!("file://{}", entry.path().canonicalize()?.display());

        rank += 1;
        match engine
            .add(ForwardRecordRequest {
                title: &title,
                text: &text,
                url: &url,
                rank,
            })
            .await
        {
            Ok(doc_id) => tracing::info!(doc_id, %url, "indexed"),
            Err(err) => tracing::warn!(%url, %err, "skipped"),
        }
    }

    println!("indexed {} documents", engine.document_count().await?);
    Ok(())
}

async fn run_search(store: &PathBuf, query: &str, limit: usize) -> anyhow::Result<()> {
    let engine = open_engine(store).await?;
    let hits = engine.search(query, limit).await?;
    if hits.is_empty() {
        println!("no results");
    }
    for hit in hits {
        println!("{}\n{}\n{}\n", hit.title, hit.url, hit.introduction);
    }
    Ok(())
}
