use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docsim_core::config::{Config, Settings};
use docsim_core::data_processor::DataProcessor;
use docsim_core::{logging, VectorStore};
use docsim_embed::get_default_embedder;
use docsim_store::RedisStore;
use docsim_vector::{DocumentIndexer, EmbedProvider, QueryEngine};

/// Index a directory of text files into Redis, then rank it against one query.
#[derive(Parser, Debug)]
#[command(name = "docsim", version, about = "Content-addressed document similarity search")]
struct Cli {
    /// Directory to ingest (defaults to `data.root_dir`).
    data_dir: Option<PathBuf>,
    /// Query text (defaults to `query.text`).
    #[arg(short, long)]
    query: Option<String>,
    /// Print only the top N results.
    #[arg(short, long)]
    limit: Option<usize>,
    /// Redis address, `host:port` or a `redis://` URL.
    #[arg(short, long)]
    address: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Exit code of the first library error in the chain; 1 for anything else.
fn exit_code(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<docsim_core::Error>())
        .map_or(1, |err| err.class().exit_code())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let mut settings: Settings = config.settings()?;
    logging::init(&settings.log.level);
    if let Some(address) = cli.address { settings.store.address = address; }
    info!(env = config.env_name(), "configuration loaded");

    let data_dir = cli.data_dir.unwrap_or_else(|| settings.root_dir());
    let query = cli.query.unwrap_or_else(|| settings.query.text.clone());
    let limit = cli.limit.or(settings.query.limit);

    println!("Document similarity search\n==========================");
    println!("Data directory: {}", data_dir.display());

    let documents = DataProcessor::with_extension(&settings.data.extension)
        .process_directory(&data_dir)
        .with_context(|| format!("ingesting {}", data_dir.display()))?;
    println!("Loaded {} documents", documents.len());

    let embedder = get_default_embedder(&settings.embedding)?;
    let provider = EmbedProvider::new(embedder).with_timeout(settings.embedding.timeout())?;

    let store: Arc<dyn VectorStore> = Arc::new(
        RedisStore::from_settings(&settings.store)
            .with_context(|| format!("connecting to {}", settings.store.address))?,
    );

    let indexer = DocumentIndexer::new(Arc::clone(&store), provider.clone()).with_key_prefix(&settings.store.key_prefix);
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!("Embedding {} documents", documents.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let indexed = indexer.index(&documents);
    spinner.finish_and_clear();
    let indexed = indexed.context("indexing pass")?;
    println!("📊 Stored {} distinct documents", indexed);

    let engine = QueryEngine::new(store, provider).with_key_prefix(&settings.store.key_prefix);
    let outcome = match limit {
        Some(k) => engine.query_top_k(&query, k),
        None => engine.query(&query),
    }
    .with_context(|| format!("query {:?}", query))?;

    println!("\n🔍 Query: {}", query);
    for (rank, doc) in outcome.results.iter().enumerate() {
        println!("{:>3}. {:.4}  {}", rank + 1, doc.score, preview(&doc.text));
    }
    if outcome.skipped_count() > 0 {
        println!("⚠️  Skipped {} unreadable entries", outcome.skipped_count());
    }
    match outcome.best() {
        Some(best) => println!("\n✅ Best match ({:.4}): {}", best.score, preview(&best.text)),
        None => println!("\nNo documents in the store"),
    }
    Ok(())
}

fn preview(text: &str) -> String {
    const MAX: usize = 80;
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= MAX { line } else { format!("{}…", line.chars().take(MAX).collect::<String>()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_errors_map_to_class_exit_codes() {
        let err = anyhow::Error::new(docsim_core::Error::store("down")).context("connecting");
        assert_eq!(exit_code(&err), 75);
        let err = anyhow::Error::new(docsim_core::Error::InvalidConfig("bad".into()));
        assert_eq!(exit_code(&err), 78);
        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn preview_collapses_whitespace_and_truncates() {
        assert_eq!(preview("a\n  b\tc"), "a b c");
        let long = "x".repeat(100);
        assert_eq!(preview(&long).chars().count(), 81);
    }

    #[test]
    fn cli_parses_positional_and_flags() {
        let cli = Cli::parse_from(["docsim", "corpus", "--query", "dogs", "-l", "3", "--address", "redis:6380"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("corpus")));
        assert_eq!(cli.query.as_deref(), Some("dogs"));
        assert_eq!(cli.limit, Some(3));
        assert_eq!(cli.address.as_deref(), Some("redis:6380"));
    }
}
