//! Corpus -> chunks -> embeddings -> persisted index.
//!
//! Documents are processed in source-id order and segments in text order, so
//! two runs over the same corpus assign the same entry ids. Identical segment
//! texts are embedded once (keyed by blake3 content hash). Embedding runs with
//! bounded concurrency through an order-preserving buffered stream. Any failed
//! embed call aborts the run before anything is written.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::{stream, StreamExt, TryStreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tcgrules_core::chunker::Chunker;
use tcgrules_core::corpus::Corpus;
use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;
use tcgrules_core::types::Segment;

use crate::format;
use crate::store::IndexStore;

pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub documents: usize,
    pub segments: usize,
    /// Distinct segment texts actually sent to the embedder.
    pub unique_segments: usize,
    pub dimension: usize,
    pub model_id: String,
}

pub struct Ingestor {
    chunker: Chunker,
    embedder: Arc<dyn Embedder>,
    concurrency: usize,
    show_progress: bool,
}

fn content_hash(s: &str) -> blake3::Hash {
    blake3::hash(s.as_bytes())
}

impl Ingestor {
    pub fn new(chunker: Chunker, embedder: Arc<dyn Embedder>) -> Self {
        Self { chunker, embedder, concurrency: DEFAULT_CONCURRENCY, show_progress: false }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Draws an indicatif progress bar while embedding (CLI use).
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// Builds the in-memory store without touching disk.
    pub async fn build(&self, corpus: &Corpus) -> Result<(IndexStore, IngestReport)> {
        if corpus.is_empty() {
            return Err(Error::EmptyCorpus(corpus.root().to_path_buf()));
        }

        let mut segments: Vec<Segment> = Vec::new();
        for doc in corpus.documents() {
            let doc_segments = self.chunker.segments(doc);
            debug!(source_id = %doc.source_id, segments = doc_segments.len(), "chunked document");
            segments.extend(doc_segments);
        }
        if segments.is_empty() {
            warn!(root = %corpus.root().display(), "corpus contains only empty documents");
            return Err(Error::EmptyCorpus(corpus.root().to_path_buf()));
        }

        // Map every segment to the slot of the first segment with the same text.
        let mut slots: HashMap<blake3::Hash, usize> = HashMap::new();
        let mut unique: Vec<&str> = Vec::new();
        let mut slot_of: Vec<usize> = Vec::with_capacity(segments.len());
        for seg in &segments {
            let slot = *slots.entry(content_hash(&seg.text)).or_insert_with(|| {
                unique.push(seg.text.as_str());
                unique.len() - 1
            });
            slot_of.push(slot);
        }

        info!(
            documents = corpus.len(),
            segments = segments.len(),
            unique = unique.len(),
            model_id = self.embedder.embedder_id(),
            "embedding corpus"
        );
        let vectors = self.embed_all(&unique).await?;
        let unique_segments = unique.len();

        let mut store = IndexStore::with_model(self.embedder.embedder_id());
        for (seg, slot) in segments.into_iter().zip(slot_of) {
            store.insert(seg, vectors[slot].clone())?;
        }
        let report = IngestReport {
            documents: corpus.len(),
            segments: store.len(),
            unique_segments,
            dimension: store.dimension().unwrap_or(0),
            model_id: store.model_id().to_string(),
        };
        Ok((store, report))
    }

    /// Builds the store and atomically replaces the file at `index_path`.
    pub async fn ingest(&self, corpus: &Corpus, index_path: &Path) -> Result<(IndexStore, IngestReport)> {
        let (store, report) = self.build(corpus).await?;
        let path = index_path.to_path_buf();
        let (store, saved) = tokio::task::spawn_blocking(move || {
            let saved = format::save(&store, &path);
            (store, saved)
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        saved?;
        info!(
            segments = report.segments,
            dimension = report.dimension,
            path = %index_path.display(),
            "ingestion complete"
        );
        Ok((store, report))
    }

    async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let pb = self.progress_bar(texts.len());
        let expected = self.embedder.dim();
        let owned: Vec<String> = texts.iter().map(|t| (*t).to_owned()).collect();

        // Owned items: the returned future must stay `Send` inside `tokio::spawn`.
        let result = stream::iter(owned)
            .map(|text: String| {
                let embedder = Arc::clone(&self.embedder);
                async move {
                    let v = embedder.embed(&text).await?;
                    if v.len() != expected {
                        return Err(Error::DimensionMismatch { expected, actual: v.len() });
                    }
                    Ok(v)
                }
            })
            .buffered(self.concurrency)
            .inspect_ok(|_| pb.inc(1))
            .try_collect::<Vec<_>>()
            .await;

        match &result {
            Ok(_) => pb.finish_with_message("embedded"),
            Err(e) => {
                pb.abandon_with_message("failed");
                warn!(error = %e, "embedding failed, nothing written");
            }
        }
        result
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
