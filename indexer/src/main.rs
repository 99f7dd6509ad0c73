use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexer::config::IndexerConfig;
use search_core::archive::{read_record, ArchiveWriter};
use search_core::extract::extract_html;
use search_core::tokenizer::tokenize;
use search_core::{PostingStore, RecordLocation};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index archived crawl records into a boolean inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume the indexing queue until stopped
    Run(IndexerConfig),
    /// Print the posting list stored for a token
    Lookup {
        /// Inverted index directory
        #[arg(long, env = "INDEX_PATH", default_value = "/shared_data/search_index.db")]
        index: PathBuf,
        #[arg(long)]
        token: String,
    },
    /// Append one page to an archive and print its location
    Archive {
        #[arg(long)]
        archive: PathBuf,
        #[arg(long)]
        url: String,
        /// File holding the page body
        #[arg(long)]
        input: PathBuf,
        /// fsync the archive after writing
        #[arg(long, default_value_t = false)]
        sync: bool,
    },
    /// Decode one archived record and summarize what would be indexed
    Inspect {
        #[arg(long)]
        archive: PathBuf,
        #[arg(long)]
        offset: u64,
        #[arg(long)]
        length: u64,
    },
}

#[derive(Serialize)]
struct Archived<'a> {
    url: &'a str,
    file: String,
    #[serde(flatten)]
    location: RecordLocation,
}

#[derive(Serialize)]
struct Inspected {
    url: String,
    record_id: String,
    date: Option<String>,
    content_length: usize,
    title: String,
    tokens: usize,
    unique_tokens: usize,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(config) => run(&config),
        Commands::Lookup { index, token } => lookup(&index, &token),
        Commands::Archive { archive, url, input, sync } => append(&archive, &url, &input, sync),
        Commands::Inspect { archive, offset, length } => inspect(&archive, RecordLocation { offset, length }),
    }
}

fn run(config: &IndexerConfig) -> Result<()> {
    tracing::info!(queue = %config.queue_name, "indexer service starting");
    let mut worker = indexer::start(config)?;
    let stats = worker.run()?;
    tracing::info!(done = stats.done, skipped = stats.skipped, failed = stats.failed, "worker stopped");
    Ok(())
}

fn lookup(index: &Path, token: &str) -> Result<()> {
    let store = PostingStore::open(index)
        .with_context(|| format!("opening index at {}", index.display()))?;
    let postings = store.postings(&token.to_lowercase())?;
    if postings.is_empty() {
        println!("no postings for {token:?}");
        return Ok(());
    }
    for doc_id in postings.iter() {
        println!("{doc_id}");
    }
    Ok(())
}

fn append(archive: &Path, url: &str, input: &Path, sync: bool) -> Result<()> {
    let body = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut writer = ArchiveWriter::open(archive)?.with_sync(sync);
    let location = writer.write_record(url, &body)?;
    let out = Archived { url, file: writer.path().display().to_string(), location };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn inspect(archive: &Path, location: RecordLocation) -> Result<()> {
    let record = read_record(archive, location)?;
    let extracted = extract_html(&String::from_utf8_lossy(&record.content))?;
    let tokens = tokenize(&extracted.text);
    let unique_tokens = tokens.iter().collect::<std::collections::HashSet<_>>().len();
    let out = Inspected {
        url: record.target_uri,
        record_id: record.record_id,
        date: record.date,
        content_length: record.content_length,
        title: extracted.title,
        tokens: tokens.len(),
        unique_tokens,
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
