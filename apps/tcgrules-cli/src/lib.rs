//! Shared plumbing for the `tcgrules*` binaries.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use tcgrules_core::chunker::Chunker;
use tcgrules_core::config::{Config, Settings};
use tcgrules_core::corpus::Corpus;
use tcgrules_vector::{IngestReport, Ingestor};

/// Logs go to stderr so stdout stays clean for results.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    config.settings()
}

/// Relative paths in the config resolve against the working directory.
pub fn base_dir() -> anyhow::Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Reads the corpus, embeds it and atomically replaces the index file.
pub async fn run_ingest(settings: &Settings, corpus_override: Option<PathBuf>) -> anyhow::Result<IngestReport> {
    let base = base_dir()?;
    let corpus_dir = corpus_override.unwrap_or_else(|| settings.corpus_dir(&base));
    let index_path = settings.index_path(&base);
    println!("Corpus directory: {}", corpus_dir.display());
    println!("Index file: {}", index_path.display());

    let corpus = Corpus::load(&corpus_dir)?;
    let embedder = tcgrules_embed::get_default_embedder(&settings.embedding)?;
    let ingestor = Ingestor::new(Chunker::new(settings.chunking)?, embedder)
        .with_concurrency(settings.embedding.concurrency)
        .with_progress(true);
    let (_, report) = ingestor.ingest(&corpus, &index_path).await?;
    Ok(report)
}

pub fn print_report(report: &IngestReport) {
    println!("\n✅ Ingest complete");
    println!("📊 {} documents -> {} segments ({} unique)", report.documents, report.segments, report.unique_segments);
    println!("📐 dimension={} model={}", report.dimension, report.model_id);
}
