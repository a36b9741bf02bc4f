#![deny(warnings)]
#![deny(unused_imports)]

use std::sync::Arc;

use tracing::info;

use tcgrules_core::config::{EmbeddingProviderKind, EmbeddingSettings};
use tcgrules_core::error::{Error, Result};
use tcgrules_core::traits::Embedder;

pub mod hash;
pub mod openai;
pub mod retry;

pub use hash::HashEmbedder;
pub use openai::OpenAiEmbedder;
pub use retry::RetryingEmbedder;

/// Env switch forcing the offline hash embedder regardless of settings.
pub const FAKE_EMBEDDINGS_ENV: &str = "APP_USE_FAKE_EMBEDDINGS";

fn use_fake_embeddings() -> bool {
    std::env::var(FAKE_EMBEDDINGS_ENV)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Builds the configured embedder wrapped in timeout/retry handling.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if use_fake_embeddings() || settings.provider == EmbeddingProviderKind::Hash {
        info!(dim = settings.dimension, "using hash embedder");
        return Ok(Arc::new(wrap(HashEmbedder::new(settings.dimension)?, settings)));
    }

    let api_key = std::env::var(&settings.api_key_env).map_err(|_| {
        Error::InvalidConfig(format!("environment variable {} is not set", settings.api_key_env))
    })?;
    let embedder = OpenAiEmbedder::new(api_key)
        .with_model(settings.model.clone(), settings.dimension)
        .with_base_url(settings.base_url.clone());
    info!(model = %settings.model, dim = settings.dimension, "using OpenAI-compatible embedder");
    Ok(Arc::new(wrap(embedder, settings)))
}

fn wrap<E: Embedder>(inner: E, settings: &EmbeddingSettings) -> RetryingEmbedder<E> {
    RetryingEmbedder::new(inner)
        .with_timeout(settings.timeout())
        .with_retries(settings.retries)
        .with_backoff(settings.backoff())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_a_config_error() {
        if use_fake_embeddings() {
            return;
        }
        let settings = EmbeddingSettings {
            api_key_env: "TCGRULES_TEST_KEY_THAT_IS_NEVER_SET".into(),
            ..EmbeddingSettings::default()
        };
        match get_default_embedder(&settings) {
            Err(Error::InvalidConfig(msg)) => assert!(msg.contains("TCGRULES_TEST_KEY_THAT_IS_NEVER_SET")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected a configuration error"),
        }
    }
}
