//! Deterministic offline embedder.
//!
//! Hashes lowercase alphanumeric tokens into a fixed number of buckets with a
//! hash-derived sign and weight, then L2-normalises. Texts sharing words end
//! up with positive cosine similarity, which is enough for tests and for
//! running the pipeline without network access.

use async_trait::async_trait;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;

pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidArgument("embedding dimension must be positive".into()));
        }
        Ok(Self { dim, id: format!("hash:xxh64:d{dim}") })
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            let weight = 0.5 + ((h >> 32) as u32 as f32) / (u32::MAX as f32);
            v[idx] += sign * weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
