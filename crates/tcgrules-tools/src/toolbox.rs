use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use tcgrules_core::error::Result;

use crate::facade::{QueryTool, ToolResponse};

/// The fixed set of tools the orchestration layer can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    RulesSearch,
    CardSearch,
}

struct ToolSpec {
    kind: ToolKind,
    name: &'static str,
    description: &'static str,
    query_hint: &'static str,
}

const TOOLS: [ToolSpec; 2] = [
    ToolSpec {
        kind: ToolKind::RulesSearch,
        name: "rules-search",
        description: "Semantic search over the Pokémon TCG rules and judge calls. \
            Use it for questions about game rules, card interactions, tournament rulings or judge calls.",
        query_hint: "The search query about Pokémon TCG rules or rulings",
    },
    ToolSpec {
        kind: ToolKind::CardSearch,
        name: "card-search",
        description: "Look up Pokémon cards by name. \
            Use it when the user asks about a specific card, its details, or wants to see it.",
        query_hint: "The card name to search for",
    },
];

impl ToolKind {
    pub const ALL: [ToolKind; 2] = [ToolKind::RulesSearch, ToolKind::CardSearch];

    fn spec(self) -> &'static ToolSpec {
        match self {
            ToolKind::RulesSearch => &TOOLS[0],
            ToolKind::CardSearch => &TOOLS[1],
        }
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }

    pub fn description(self) -> &'static str {
        self.spec().description
    }

    pub fn from_name(name: &str) -> Option<Self> {
        TOOLS.iter().find(|t| t.name == name).map(|t| t.kind)
    }

    /// JSON schema of the single `query` parameter.
    pub fn parameters_schema(self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": self.spec().query_hint }
            },
            "required": ["query"],
        })
    }
}

/// Summary of one catalog card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub set: String,
    pub number: String,
    pub image_url: Option<String>,
}

pub type CardResponse = ToolResponse<Card>;

/// Structured card lookup, provided by the embedding application.
#[async_trait]
pub trait CardCatalog: Send + Sync {
    async fn search_cards(&self, query: &str, limit: usize) -> Result<Vec<Card>>;
}

pub const CARD_LIMIT: usize = 5;

pub struct Toolbox {
    rules: QueryTool,
    cards: Option<Arc<dyn CardCatalog>>,
}

impl Toolbox {
    pub fn new(rules: QueryTool) -> Self {
        Self { rules, cards: None }
    }

    pub fn with_card_catalog(mut self, catalog: Arc<dyn CardCatalog>) -> Self {
        self.cards = Some(catalog);
        self
    }

    pub fn rules(&self) -> &QueryTool {
        &self.rules
    }

    pub fn list_schemas() -> Vec<serde_json::Value> {
        ToolKind::ALL
            .iter()
            .map(|kind| {
                serde_json::json!({
                    "name": kind.name(),
                    "description": kind.description(),
                    "parameters": kind.parameters_schema(),
                })
            })
            .collect()
    }

    /// Runs one tool and returns its JSON output. Never fails.
    pub async fn dispatch(&self, kind: ToolKind, query: &str) -> String {
        match kind {
            ToolKind::RulesSearch => self.rules.query(query).await.to_json(),
            ToolKind::CardSearch => self.search_cards(query).await.to_json(),
        }
    }

    pub async fn dispatch_named(&self, name: &str, query: &str) -> String {
        match ToolKind::from_name(name) {
            Some(kind) => self.dispatch(kind, query).await,
            None => ToolResponse::<serde_json::Value>::failed(query, format!("unknown tool '{name}'")).to_json(),
        }
    }

    async fn search_cards(&self, query: &str) -> CardResponse {
        let Some(catalog) = &self.cards else {
            return CardResponse::failed(query, "card search is not configured");
        };
        if query.trim().is_empty() {
            return CardResponse::failed(query, "query must not be empty");
        }
        match catalog.search_cards(query, CARD_LIMIT).await {
            Ok(mut cards) => {
                cards.truncate(CARD_LIMIT);
                CardResponse::ok(query, cards)
            }
            Err(e) => {
                warn!(query, error = %e, "card search failed");
                CardResponse::failed(query, e)
            }
        }
    }
}
