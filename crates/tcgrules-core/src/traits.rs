use async_trait::async_trait;

use crate::error::Result;

/// Text → fixed-length vector capability.
///
/// Implementations must return vectors of exactly `dim()` floats and fail with
/// `Error::EmbeddingUnavailable` on transport or auth problems. `embedder_id`
/// is recorded in the index header so a store built with one model is never
/// queried with another.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `openai:text-embedding-3-small`).
    fn embedder_id(&self) -> &str;

    /// Embedding dimensionality.
    fn dim(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds `texts` in order. The default calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
