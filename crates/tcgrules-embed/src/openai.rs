//! OpenAI-compatible embeddings provider using the `/v1/embeddings` endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};

use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DIMS: usize = 1536;

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: Secret<String>,
    base_url: String,
    model: String,
    dims: usize,
    id: String,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Secret::new(api_key),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dims: DEFAULT_DIMS,
            id: format!("openai:{DEFAULT_MODEL}"),
        }
    }

    pub fn with_model(mut self, model: String, dims: usize) -> Self {
        self.id = format!("openai:{model}");
        self.model = model;
        self.dims = dims;
        self
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn check_dims(&self, vectors: &[Vec<f32>]) -> Result<()> {
        match vectors.iter().find(|v| v.len() != self.dims) {
            Some(bad) => Err(Error::DimensionMismatch { expected: self.dims, actual: bad.len() }),
            None => Ok(()),
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

fn unavailable(e: reqwest::Error) -> Error {
    Error::EmbeddingUnavailable(e.to_string())
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::EmbeddingUnavailable("empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let req = EmbeddingRequest { model: &self.model, input: texts };

        let mut resp = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&req)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<EmbeddingResponse>()
            .await
            .map_err(unavailable)?;

        if resp.data.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} inputs",
                resp.data.len(),
                texts.len()
            )));
        }
        // The API tags each vector with its input index; don't rely on order.
        resp.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = resp.data.into_iter().map(|d| d.embedding).collect();
        self.check_dims(&vectors)?;
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_override_updates_id_and_dims() {
        let e = OpenAiEmbedder::new("sk-test".into()).with_model("text-embedding-3-large".into(), 3072);
        assert_eq!(e.embedder_id(), "openai:text-embedding-3-large");
        assert_eq!(e.dim(), 3072);
    }

    #[test]
    fn base_url_is_normalised() {
        let e = OpenAiEmbedder::new("sk-test".into()).with_base_url("http://localhost:8080/".into());
        assert_eq!(e.base_url, "http://localhost:8080");
    }

    #[test]
    fn wrong_dimension_is_reported() {
        let e = OpenAiEmbedder::new("sk-test".into()).with_model("m".into(), 3);
        let err = e.check_dims(&[vec![0.0; 3], vec![0.0; 2]]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, actual: 2 }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_embedding_unavailable() {
        // Port 9 (discard) on localhost is not an HTTP server.
        let e = OpenAiEmbedder::new("sk-test".into()).with_base_url("http://127.0.0.1:9".into());
        let err = e.embed("hello").await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(_)), "{err}");
    }
}
