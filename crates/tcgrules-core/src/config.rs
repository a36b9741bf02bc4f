//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nesting, e.g. `APP_RETRIEVAL__TOP_K=8`).
//! Provides helpers to expand `~` and `${VAR}` and to resolve relative paths
//! against a known base directory.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chunker::ChunkingConfig;
use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Builds a config from an explicit figment, bypassing files and env.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let settings = self.settings()?;
        let production = matches!(env, "prod" | "production");
        if production && settings.embedding.provider == EmbeddingProviderKind::Hash {
            anyhow::bail!("hash embeddings are for development only; configure a real provider in production");
        }
        Ok(())
    }
}

/// Typed view over the merged configuration. Every field has a default, so an
/// empty `config.toml` is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Root holding `rules/` and `judge-calls/`.
    pub corpus_dir: String,
    /// Single-file persisted index.
    pub index_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { corpus_dir: "data".into(), index_path: "data/vector-store/index.tcgx".into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    OpenAi,
    Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProviderKind,
    pub model: String,
    pub dimension: usize,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    /// Embedding requests kept in flight during ingestion.
    pub concurrency: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::OpenAi,
            model: "text-embedding-3-small".into(),
            dimension: 1536,
            base_url: "https://api.openai.com".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            timeout_ms: 30_000,
            retries: 3,
            backoff_ms: 500,
            concurrency: 4,
        }
    }
}

impl EmbeddingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    /// Upper bound for one load-or-build sequence.
    pub init_timeout_ms: u64,
    /// Upper bound for one facade query, including lazy initialisation.
    pub query_timeout_ms: u64,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { top_k: 5, init_timeout_ms: 600_000, query_timeout_ms: 30_000 }
    }
}

impl RetrievalSettings {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl Settings {
    pub fn validate(&self) -> crate::error::Result<()> {
        self.chunking
            .validate()
            .map_err(|e| Error::InvalidConfig(format!("chunking: {e}")))?;
        if self.retrieval.top_k == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k must be positive".into()));
        }
        if self.embedding.concurrency == 0 {
            return Err(Error::InvalidConfig("embedding.concurrency must be positive".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(Error::InvalidConfig("embedding.dimension must be positive".into()));
        }
        let zero_timeout = [
            ("embedding.timeout_ms", self.embedding.timeout_ms),
            ("retrieval.init_timeout_ms", self.retrieval.init_timeout_ms),
            ("retrieval.query_timeout_ms", self.retrieval.query_timeout_ms),
        ]
        .into_iter()
        .find(|(_, ms)| *ms == 0);
        if let Some((key, _)) = zero_timeout {
            return Err(Error::InvalidConfig(format!("{key} must be positive")));
        }
        Ok(())
    }

    pub fn corpus_dir(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.data.corpus_dir)
    }

    pub fn index_path(&self, base: &Path) -> PathBuf {
        resolve_with_base(base, &self.data.index_path)
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
