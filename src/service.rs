//! Search Service
//!
//! The boundary the HTTP layer talks to. It validates input, applies the
//! configured limits and delegates to the retriever, the autocomplete index,
//! the change feed and the rate limiter.

use crate::config::{AutocompleteConfig, SearchConfig};
use crate::error::{Error, Result};
use crate::index::autocomplete::AutocompleteIndex;
use crate::index::projector::ProjectorRegistry;
use crate::ingestion::feed::ChangeFeed;
use crate::ingestion::types::{ChangeEvent, Method};
use crate::ratelimit::limiter::RateLimiter;
use crate::search::engine::{Retriever, SearchHit};

use std::sync::Arc;

pub struct SearchService {
    retriever: Retriever,
    autocomplete: AutocompleteIndex,
    registry: Arc<ProjectorRegistry>,
    feed: Arc<dyn ChangeFeed>,
    feed_topic: String,
    limiter: Arc<RateLimiter>,
    search_config: SearchConfig,
    autocomplete_config: AutocompleteConfig,
}

impl SearchService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        retriever: Retriever,
        autocomplete: AutocompleteIndex,
        registry: Arc<ProjectorRegistry>,
        feed: Arc<dyn ChangeFeed>,
        feed_topic: &str,
        limiter: Arc<RateLimiter>,
        search_config: SearchConfig,
        autocomplete_config: AutocompleteConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            retriever,
            autocomplete,
            registry,
            feed,
            feed_topic: feed_topic.to_string(),
            limiter,
            search_config,
            autocomplete_config,
        })
    }

    /// Ranked, hydrated results. An empty list is a valid answer; an empty
    /// query or an entity type nothing is indexed under is not.
    pub async fn search(
        &self,
        entity_type: &str,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let entity_type = entity_type.trim();
        if query.trim().is_empty() {
            return Err(Error::InvalidInput("query parameter is required".to_string()));
        }
        if !self.registry.supports_index_type(entity_type) {
            return Err(Error::UnsupportedType(entity_type.to_string()));
        }

        let limit = self.search_config.effective_limit(limit);
        self.retriever.search(entity_type, query, limit).await
    }

    pub async fn autocomplete(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>> {
        if prefix.trim().is_empty() {
            return Err(Error::InvalidInput("prefix parameter is required".to_string()));
        }

        let limit = match limit {
            Some(0) | None => self.autocomplete_config.default_limit,
            Some(limit) => limit.min(self.search_config.max_limit),
        };
        self.autocomplete.suggest(prefix, limit).await
    }

    /// Validates `raw` as a change event and publishes it unchanged. Returns
    /// how many consumers were listening. Creates and updates for a source
    /// type with no projector are refused before anything is published;
    /// deletes are keyed by id alone and pass regardless of type.
    pub async fn submit_change_event(&self, raw: &str) -> Result<usize> {
        let event = ChangeEvent::parse(raw)?;
        if event.method != Method::Delete && !self.registry.has_projector(&event.entity_type) {
            return Err(Error::UnsupportedType(event.entity_type));
        }

        let delivered = self
            .feed
            .publish(&self.feed_topic, raw.to_string())
            .await?;

        tracing::info!(
            "Accepted {} for {}/{} ({} subscribers)",
            event.method,
            event.entity_type,
            event.entity_id,
            delivered
        );
        Ok(delivered)
    }

    /// Admission check for one request from `identity`.
    pub fn allow(&self, identity: &str) -> bool {
        self.limiter.allow(identity)
    }
}
