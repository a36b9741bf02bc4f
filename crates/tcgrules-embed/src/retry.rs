//! Timeout + bounded retry around any `Embedder`.
//!
//! Every attempt is capped by `timeout`; transient failures (see
//! `Error::is_transient`) are retried up to `retries` more times, sleeping
//! `backoff * attempt` in between. Anything else is returned immediately.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_MS: u64 = 500;

pub struct RetryingEmbedder<E> {
    inner: E,
    timeout: Duration,
    retries: u32,
    backoff: Duration,
}

impl<E: Embedder> RetryingEmbedder<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            retries: DEFAULT_RETRIES,
            backoff: Duration::from_millis(DEFAULT_BACKOFF_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    async fn attempt<'a, T, F, Fut>(&'a self, what: &str, call: F) -> Result<T>
    where
        F: Fn(&'a E) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call(&self.inner)).await {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(format!("{what} exceeded {:?}", self.timeout))),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, retries = self.retries, error = %e, "{what} failed, retrying");
                    sleep(self.backoff * attempt).await;
                }
                Err(Error::Timeout(msg)) => return Err(Error::EmbeddingUnavailable(msg)),
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<E: Embedder> Embedder for RetryingEmbedder<E> {
    fn embedder_id(&self) -> &str {
        self.inner.embedder_id()
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.attempt("embed", |inner| inner.embed(text)).await
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.attempt("embed_batch", |inner| inner.embed_batch(texts)).await
    }
}
