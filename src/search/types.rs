use crate::search::engine::SearchHit;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query string of the search endpoint. `q` wins over `query` when both are set.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub query: Option<String>,
    pub limit: Option<usize>,
}

impl SearchParams {
    pub fn text(&self) -> &str {
        self.q
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or(self.query.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub prefix: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub entity_type: String,
    pub query: String,
    pub count: usize,
    pub results: Vec<SearchResultItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub id: String,
    pub entity_type: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub score: u32,
}

impl From<SearchHit> for SearchResultItem {
    fn from(hit: SearchHit) -> Self {
        let entity = hit.entity;
        Self {
            id: entity.id,
            entity_type: entity.entity_type,
            title: entity.title,
            description: entity.description,
            image: entity.image,
            created_at: entity.created_at,
            score: hit.score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub prefix: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
