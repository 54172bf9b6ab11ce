//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docindex::{IndexConfig, SplitMode};

#[derive(Debug, Parser)]
#[command(name = "docindex")]
#[command(about = "Index documents and search them by meaning")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for newly created indexes
    #[arg(long, global = true)]
    pub index_dir: Option<PathBuf>,

    /// Maximum chunk size
    #[arg(long, global = true)]
    pub chunk_size: Option<usize>,

    /// Overlap between adjacent chunks
    #[arg(long, global = true)]
    pub chunk_overlap: Option<usize>,

    /// Splitting mode: default, code or token-count
    #[arg(long, global = true, value_parser = parse_mode)]
    pub mode: Option<SplitMode>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest files or directories into an index
    Ingest {
        /// Files or directories to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Index file to append to; a new index is created if omitted or missing
        #[arg(short, long)]
        index: Option<PathBuf>,
    },

    /// Search an index
    Search {
        /// Query text
        query: String,

        /// Index file to search
        #[arg(short, long)]
        index: PathBuf,

        /// Maximum results (defaults to the configured top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the documents in an index
    List {
        /// Index file
        #[arg(short, long)]
        index: PathBuf,
    },

    /// Remove a document from an index
    Remove {
        /// Document id
        id: String,

        /// Index file
        #[arg(short, long)]
        index: PathBuf,
    },

    /// Extract and split a file without embedding it
    Split {
        /// File to split
        path: PathBuf,
    },
}

fn parse_mode(value: &str) -> std::result::Result<SplitMode, String> {
    value.parse().map_err(|e: docindex::DocIndexError| e.to_string())
}

impl Cli {
    /// The effective configuration: file (or defaults) with flag overrides.
    pub fn load_config(&self) -> Result<IndexConfig> {
        let mut config = match &self.config {
            Some(path) => IndexConfig::from_file(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => IndexConfig::default(),
        };
        apply_overrides(&mut config, self);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn apply_overrides(config: &mut IndexConfig, cli: &Cli) {
    if let Some(dir) = &cli.index_dir {
        config.index_dir = dir.clone();
    }
    if let Some(size) = cli.chunk_size {
        config.chunk_size = size;
    }
    if let Some(overlap) = cli.chunk_overlap {
        config.chunk_overlap = overlap;
    }
    if let Some(mode) = cli.mode {
        config.split_mode = mode;
    }
}

/// Shorten `text` to one line of at most `width` characters.
pub fn preview(text: &str, width: usize) -> String {
    let line: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= width {
        return line;
    }
    let cut: String = line.chars().take(width.saturating_sub(3)).collect();
    format!("{cut}...")
}
