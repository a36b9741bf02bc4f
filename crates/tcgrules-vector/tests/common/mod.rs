#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tcgrules_core::chunker::{Chunker, ChunkingConfig};
use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;
use tcgrules_vector::Ingestor;

pub const RULE_TEXT: &str = "Attach one Energy card to one of your Pokémon each turn.";
pub const RULING_TEXT: &str = "A Pokémon with Burn cannot also carry Poison as a separate check.";

pub fn seed_corpus(root: &Path) {
    fs::create_dir_all(root.join("rules")).unwrap();
    fs::create_dir_all(root.join("judge-calls")).unwrap();
    fs::write(root.join("rules/basic.txt"), RULE_TEXT).unwrap();
    fs::write(root.join("judge-calls/ruling1.txt"), RULING_TEXT).unwrap();
}

pub fn chunker() -> Chunker {
    Chunker::new(ChunkingConfig { max_len: 40, overlap: 5 }).unwrap()
}

pub fn ingestor(embedder: Arc<dyn Embedder>) -> Ingestor {
    Ingestor::new(chunker(), embedder).with_concurrency(2)
}

/// One dimension per vocabulary word (trailing plural `s` ignored), so
/// rankings in tests can be checked by hand.
pub struct KeywordEmbedder;

const VOCAB: [&str; 8] = ["energy", "card", "turn", "attach", "pokémon", "burn", "poison", "check"];

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn embedder_id(&self) -> &str {
        "keyword:v1"
    }

    fn dim(&self) -> usize {
        VOCAB.len()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0; VOCAB.len()];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let token = token.to_lowercase();
            let stem = token.strip_suffix('s').unwrap_or(&token);
            if let Some(i) = VOCAB.iter().position(|w| *w == token || *w == stem) {
                v[i] += 1.0;
            }
        }
        Ok(v)
    }
}

/// Counts calls to the wrapped embedder; optionally slow.
pub struct CountingEmbedder<E> {
    pub inner: E,
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl<E> CountingEmbedder<E> {
    pub fn new(inner: E, delay: Duration) -> Self {
        Self { inner, calls: AtomicUsize::new(0), delay }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<E: Embedder> Embedder for CountingEmbedder<E> {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }
}

/// Fails with `EmbeddingUnavailable` while `failing` is set.
pub struct SwitchableEmbedder {
    pub failing: AtomicBool,
}

impl SwitchableEmbedder {
    pub fn failing() -> Self {
        Self { failing: AtomicBool::new(true) }
    }

    pub fn heal(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Embedder for SwitchableEmbedder {
    fn embedder_id(&self) -> &str {
        "keyword:v1"
    }

    fn dim(&self) -> usize {
        KeywordEmbedder.dim()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::EmbeddingUnavailable("provider is down".into()));
        }
        KeywordEmbedder.embed(text).await
    }
}
