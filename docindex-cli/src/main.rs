//! # docindex CLI
//!
//! Command-line front end for the `docindex` library.
//!
//! ## Commands
//!
//! - `docindex ingest <PATH>... [--index FILE]` - Extract, chunk, embed and store files
//! - `docindex search <QUERY> --index FILE` - Rank indexed chunks against a query
//! - `docindex list --index FILE` - Show the documents in an index
//! - `docindex remove <ID> --index FILE` - Drop a document from an index
//! - `docindex split <FILE>` - Preview how a file would be chunked
//!
//! Embedding commands read `OPENAI_API_KEY` (and optionally `OPENAI_BASE_URL`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use docindex::openai::OpenAIEmbeddingProvider;
use docindex::splitter::mode_for_extension;
use docindex::{
    Document, DocumentPipeline, Embedder, ExtractorRegistry, Index, IndexConfig, Retriever,
    TextSplitter,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, preview};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.load_config()?;

    match cli.command {
        Command::Ingest { paths, index } => ingest(&config, &paths, index.as_deref()).await,
        Command::Search { query, index, top_k, json } => {
            search(&config, &query, &index, top_k.unwrap_or(config.top_k), json).await
        }
        Command::List { index } => list(&index),
        Command::Remove { id, index } => remove(&id, &index),
        Command::Split { path } => split(&config, &path),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn pipeline(config: &IndexConfig) -> Result<DocumentPipeline> {
    let provider = OpenAIEmbeddingProvider::from_env().context("embedding provider unavailable")?;
    Ok(DocumentPipeline::builder()
        .config(config.clone())
        .embedding_provider(Arc::new(provider))
        .build()?)
}

async fn ingest(config: &IndexConfig, paths: &[PathBuf], index: Option<&Path>) -> Result<()> {
    let pipeline = pipeline(config)?;
    let mut index = Index::open(index, &config.index_dir)?;

    let mut added = 0;
    for path in paths {
        let records = if path.is_dir() {
            pipeline.ingest_dir(path).await?
        } else {
            vec![
                pipeline
                    .ingest(path)
                    .await
                    .with_context(|| format!("failed to ingest {}", path.display()))?,
            ]
        };
        for record in records {
            let fname = record.fname.clone();
            let chunks = record.data.len();
            let id = index.add(record)?;
            println!("{id}  {fname}  ({chunks} chunks)");
            added += 1;
        }
    }

    info!(index.id = %index.id(), added, "ingestion finished");
    println!("index {} at {}", index.id(), index.path().display());
    Ok(())
}

async fn search(
    config: &IndexConfig,
    query: &str,
    index_path: &Path,
    top_k: usize,
    json: bool,
) -> Result<()> {
    let index = Index::load(index_path)?;
    let provider = OpenAIEmbeddingProvider::from_env().context("embedding provider unavailable")?;
    let embedder =
        Embedder::new(Arc::new(provider)).with_normalization(config.normalize_embeddings);

    let results = Retriever::new(embedder).search(query, top_k, &index).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("no results");
    }
    for result in results {
        println!("{:.4}  {:<10}  {}", result.similarity, result.id, preview(&result.text, 80));
    }
    Ok(())
}

fn list(index_path: &Path) -> Result<()> {
    let index = Index::load(index_path)?;
    println!("index {} ({} documents, {} chunks)", index.id(), index.len(), index.chunk_count());
    for record in index.documents() {
        println!("{}  {:>5} chunks  {}", record.id, record.data.len(), record.fpath);
    }
    Ok(())
}

fn remove(id: &str, index_path: &Path) -> Result<()> {
    let mut index = Index::load(index_path)?;
    match index.remove(id)? {
        Some(record) => println!("removed {} ({})", record.id, record.fname),
        None => anyhow::bail!("no document with id {id} in index {}", index.id()),
    }
    Ok(())
}

fn split(config: &IndexConfig, path: &Path) -> Result<()> {
    let doc = Document::open(path)?;
    let segments = ExtractorRegistry::with_defaults().extract(doc.path())?;

    let (mode, language) = mode_for_extension(doc.ext(), config.split_mode);
    let splitter = TextSplitter::for_mode(
        mode,
        language,
        config.chunk_size,
        config.chunk_overlap,
        &config.token_model,
    )?;

    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    for (i, chunk) in splitter.split_segments(&texts).iter().enumerate() {
        println!(
            "--- chunk {} ({mode}, segment {}, length {}) ---",
            i + 1,
            chunk.segment,
            splitter.length(&chunk.text)
        );
        println!("{}", chunk.text);
    }
    Ok(())
}
