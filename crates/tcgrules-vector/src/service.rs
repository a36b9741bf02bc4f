//! Lazily initialised, process-wide access to the index.
//!
//! Lifecycle:
//!
//! ```text
//! Uninitialized --first call--> Initializing --load ok--> Loaded
//!                                    |                      ^
//!                                    +--load fails--> build-+
//!                                                       |
//!                                                       +--build fails--> Failed --next fresh call--> Initializing
//! ```
//!
//! The load-or-build runs in a task owned by the service, not in the caller
//! that triggered it. Every caller that arrives while it is in flight awaits
//! the same task and gets its outcome: the store, or `RetrievalUnavailable`
//! when that attempt failed. Dropping a caller drops only its wait. Once
//! loaded, the store is shared as an `Arc` and searched without locking.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};

use tcgrules_core::chunker::Chunker;
use tcgrules_core::config::Settings;
use tcgrules_core::corpus::Corpus;
use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;
use tcgrules_core::types::Passage;

use crate::format;
use crate::ingest::{IngestReport, Ingestor};
use crate::store::IndexStore;

pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Status {
    Uninitialized,
    Initializing,
    Loaded { entries: usize, dimension: usize, model_id: String },
    Failed { reason: String },
}

/// Outcome of one initialisation attempt, cloneable for every waiter.
type PendingInit = Shared<BoxFuture<'static, std::result::Result<Arc<IndexStore>, String>>>;

enum State {
    Uninitialized,
    Initializing { generation: u64, pending: PendingInit },
    Loaded(Arc<IndexStore>),
    Failed { reason: String },
}

struct Inner {
    ingestor: Ingestor,
    corpus_dir: PathBuf,
    index_path: PathBuf,
    state: Mutex<State>,
    generations: AtomicU64,
    rebuilding: Mutex<()>,
}

pub struct RetrievalService {
    inner: Arc<Inner>,
    init_timeout: Duration,
}

impl RetrievalService {
    pub fn new(ingestor: Ingestor, corpus_dir: impl Into<PathBuf>, index_path: impl Into<PathBuf>) -> Self {
        let inner = Inner {
            ingestor,
            corpus_dir: corpus_dir.into(),
            index_path: index_path.into(),
            state: Mutex::new(State::Uninitialized),
            generations: AtomicU64::new(0),
            rebuilding: Mutex::new(()),
        };
        Self { inner: Arc::new(inner), init_timeout: DEFAULT_INIT_TIMEOUT }
    }

    /// Wires the configured embedder, chunker and paths; relative paths in
    /// `settings` resolve against `base`.
    pub fn from_settings(settings: &Settings, base: &Path) -> Result<Self> {
        settings.validate()?;
        let embedder = tcgrules_embed::get_default_embedder(&settings.embedding)?;
        let ingestor = Ingestor::new(Chunker::new(settings.chunking)?, embedder)
            .with_concurrency(settings.embedding.concurrency);
        Ok(Self::new(ingestor, settings.corpus_dir(base), settings.index_path(base))
            .with_init_timeout(settings.retrieval.init_timeout()))
    }

    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        self.inner.ingestor.embedder()
    }

    pub fn index_path(&self) -> &Path {
        &self.inner.index_path
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.inner.corpus_dir
    }

    /// Returns the loaded store, loading or building it on first use.
    pub async fn store(&self) -> Result<Arc<IndexStore>> {
        let pending = {
            let mut state = self.inner.state.lock().await;
            match &*state {
                State::Loaded(store) => return Ok(Arc::clone(store)),
                // A finished attempt that never settled the state (the task panicked) is retried.
                State::Initializing { pending, .. } if pending.peek().is_none() => pending.clone(),
                _ => {
                    let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
                    let pending = self.spawn_init(generation);
                    *state = State::Initializing { generation, pending: pending.clone() };
                    pending
                }
            }
        };
        pending.await.map_err(Error::RetrievalUnavailable)
    }

    /// Embeds `query` and returns the `k` closest passages.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".into()));
        }
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".into()));
        }
        let store = self.store().await?;
        let vector = self.embedder().embed(query).await?;
        store.search_passages(&vector, k)
    }

    /// Drops the in-memory store; the next call loads again. An attempt
    /// still in flight finishes for its waiters but is not kept.
    pub async fn invalidate(&self) {
        *self.inner.state.lock().await = State::Uninitialized;
        info!("retrieval index invalidated");
    }

    /// Re-ingests the corpus and swaps in the new store. On failure the
    /// current state, including a loaded store, is left as it was.
    pub async fn rebuild(&self) -> Result<IngestReport> {
        let _serial = self.inner.rebuilding.lock().await;
        match bounded(self.init_timeout, self.inner.build()).await {
            Ok((store, report)) => {
                info!(entries = store.len(), model_id = store.model_id(), "retrieval index rebuilt");
                *self.inner.state.lock().await = State::Loaded(Arc::new(store));
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "rebuild failed, keeping current index");
                Err(e)
            }
        }
    }

    pub async fn status(&self) -> Status {
        match &*self.inner.state.lock().await {
            State::Uninitialized => Status::Uninitialized,
            State::Initializing { .. } => Status::Initializing,
            State::Loaded(store) => Status::Loaded {
                entries: store.len(),
                dimension: store.dimension().unwrap_or(0),
                model_id: store.model_id().to_string(),
            },
            State::Failed { reason } => Status::Failed { reason: reason.clone() },
        }
    }

    fn spawn_init(&self, generation: u64) -> PendingInit {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(inner.initialise(generation, self.init_timeout));
        async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => Err(format!("initialisation task failed: {e}")),
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    /// Runs one attempt and settles the state, unless the attempt was
    /// superseded by `invalidate` or `rebuild` meanwhile.
    async fn initialise(
        self: Arc<Self>,
        generation: u64,
        timeout: Duration,
    ) -> std::result::Result<Arc<IndexStore>, String> {
        info!(generation, index = %self.index_path.display(), "initialising retrieval index");
        let outcome = bounded(timeout, self.load_or_build()).await.map(Arc::new);

        let mut state = self.state.lock().await;
        let current = matches!(&*state, State::Initializing { generation: g, .. } if *g == generation);
        match outcome {
            Ok(store) => {
                info!(entries = store.len(), model_id = store.model_id(), "retrieval index ready");
                if current {
                    *state = State::Loaded(Arc::clone(&store));
                }
                Ok(store)
            }
            Err(e) => {
                warn!(generation, error = %e, "retrieval index unavailable");
                let reason = e.to_string();
                if current {
                    *state = State::Failed { reason: reason.clone() };
                }
                Err(reason)
            }
        }
    }

    async fn load_or_build(&self) -> Result<IndexStore> {
        match self.load_existing().await {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!(error = %e, index = %self.index_path.display(), "persisted index unusable, rebuilding");
                self.build().await.map(|(store, _)| store)
            }
        }
    }

    async fn load_existing(&self) -> Result<IndexStore> {
        let path = self.index_path.clone();
        let store = tokio::task::spawn_blocking(move || format::load(&path))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;

        let embedder = self.ingestor.embedder();
        if store.model_id() != embedder.embedder_id() {
            return Err(Error::CorruptIndex(format!(
                "stale index built with '{}', embedder is '{}'",
                store.model_id(),
                embedder.embedder_id()
            )));
        }
        if let Some(dimension) = store.dimension() {
            if dimension != embedder.dim() {
                return Err(Error::DimensionMismatch { expected: embedder.dim(), actual: dimension });
            }
        }
        Ok(store)
    }

    async fn build(&self) -> Result<(IndexStore, IngestReport)> {
        let root = self.corpus_dir.clone();
        let corpus = tokio::task::spawn_blocking(move || Corpus::load(&root))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        self.ingestor.ingest(&corpus, &self.index_path).await
    }
}

async fn bounded<T>(timeout: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| Error::Timeout(format!("index initialisation exceeded {timeout:?}")))?
}
