//! Tool-facing wrapper around the retrieval service.
//!
//! `QueryTool::query` never fails: every error (bad input, index unavailable,
//! embedder down, timeout) becomes an empty result list with `error` set, so
//! the orchestration layer can always hand the JSON straight to the model.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tcgrules_core::config::Settings;
use tcgrules_core::error::{Error, Result};
use tcgrules_core::types::Passage;
use tcgrules_vector::RetrievalService;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

/// `{query, results, error?}` as returned to the caller of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse<T> {
    pub query: String,
    pub results: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type QueryResponse = ToolResponse<Passage>;

impl<T: Serialize> ToolResponse<T> {
    pub fn ok(query: impl Into<String>, results: Vec<T>) -> Self {
        Self { query: query.into(), results, error: None }
    }

    pub fn failed(query: impl Into<String>, error: impl ToString) -> Self {
        Self { query: query.into(), results: Vec::new(), error: Some(error.to_string()) }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "query": self.query, "results": [], "error": e.to_string() }).to_string()
        })
    }
}

pub struct QueryTool {
    service: Arc<RetrievalService>,
    top_k: usize,
    timeout: Duration,
}

impl QueryTool {
    pub fn new(service: Arc<RetrievalService>) -> Self {
        Self { service, top_k: DEFAULT_TOP_K, timeout: DEFAULT_QUERY_TIMEOUT }
    }

    pub fn from_settings(settings: &Settings, base: &Path) -> Result<Self> {
        let service = Arc::new(RetrievalService::from_settings(settings, base)?);
        Ok(Self::new(service)
            .with_top_k(settings.retrieval.top_k)
            .with_timeout(settings.retrieval.query_timeout()))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn service(&self) -> &Arc<RetrievalService> {
        &self.service
    }

    pub async fn query(&self, text: &str) -> QueryResponse {
        match self.try_query(text).await {
            Ok(results) => {
                debug!(query = text, hits = results.len(), "rules search");
                QueryResponse::ok(text, results)
            }
            Err(e) => {
                warn!(query = text, error = %e, "rules search degraded to empty result");
                QueryResponse::failed(text, e)
            }
        }
    }

    async fn try_query(&self, text: &str) -> Result<Vec<Passage>> {
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".into()));
        }
        tokio::time::timeout(self.timeout, self.service.search(text, self.top_k))
            .await
            .map_err(|_| Error::Timeout(format!("query exceeded {:?}", self.timeout)))?
    }
}
