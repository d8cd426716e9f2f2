//! Autocomplete Index
//!
//! Every indexed token is registered in one lexicographically ordered set.
//! Prefix suggestions are a closed-open range scan over that set; results are
//! cached per prefix for a short TTL, and staleness up to one TTL window is
//! accepted.

use crate::error::{Result, Stage};
use crate::storage::policy::StorePolicy;
use crate::storage::protocol::{AUTOCOMPLETE_ZSET, Batch, autocomplete_cache_key};
use crate::storage::store::IndexStore;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound appended to a prefix to close its lexicographic range.
const HIGH_SENTINEL: char = char::MAX;

/// What is stored under `autocomplete_cache:{prefix}`.
#[derive(Debug, Serialize, Deserialize)]
struct CachedSuggestions {
    words: Vec<String>,
    /// The scan returned fewer words than it asked for, so `words` is every
    /// match and can serve any limit.
    complete: bool,
}

#[derive(Clone)]
pub struct AutocompleteIndex {
    store: Arc<dyn IndexStore>,
    policy: StorePolicy,
    cache_ttl: Duration,
}

impl AutocompleteIndex {
    pub fn new(store: Arc<dyn IndexStore>, policy: StorePolicy, cache_ttl: Duration) -> Self {
        Self {
            store,
            policy,
            cache_ttl,
        }
    }

    pub fn stage_tokens<'a>(batch: &mut Batch, tokens: impl IntoIterator<Item = &'a String>) {
        for token in tokens {
            if !token.is_empty() {
                batch.add(AUTOCOMPLETE_ZSET.to_string(), token, 0.0);
            }
        }
    }

    /// Registers `words` in the vocabulary outside of an indexer batch.
    pub async fn add_words(&self, words: &[String]) -> Result<()> {
        let mut batch = Batch::new();
        Self::stage_tokens(&mut batch, words);
        if batch.is_empty() {
            return Ok(());
        }

        let store = &self.store;
        let batch = &batch;
        self.policy
            .call_with_retry(Stage::IndexStore, move || store.apply(batch))
            .await
    }

    /// Up to `limit` vocabulary tokens starting with `prefix`, in
    /// lexicographic order. The prefix is trimmed and lower-cased first.
    pub async fn suggest(&self, prefix: &str, limit: usize) -> Result<Vec<String>> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let cache_key = autocomplete_cache_key(&prefix);
        if let Some(words) = self.cached(&cache_key, limit).await {
            tracing::debug!("Autocomplete cache hit for '{}'", prefix);
            return Ok(words);
        }

        let max = format!("{}{}", prefix, HIGH_SENTINEL);
        let words = self
            .policy
            .call(
                Stage::IndexStore,
                self.store.range_by_lex(AUTOCOMPLETE_ZSET, &prefix, &max, limit),
            )
            .await?;

        self.fill_cache(&cache_key, &words, limit).await;
        Ok(words)
    }

    /// Cache failures never fail a suggestion request.
    async fn cached(&self, cache_key: &str, limit: usize) -> Option<Vec<String>> {
        let raw = match self
            .policy
            .call(Stage::IndexStore, self.store.get(cache_key))
            .await
        {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Autocomplete cache read failed: {}", e);
                return None;
            }
        };

        let cached: CachedSuggestions = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!("Discarding unreadable autocomplete cache entry: {}", e);
                return None;
            }
        };

        if cached.complete || cached.words.len() >= limit {
            let mut words = cached.words;
            words.truncate(limit);
            Some(words)
        } else {
            None
        }
    }

    async fn fill_cache(&self, cache_key: &str, words: &[String], limit: usize) {
        if self.cache_ttl.is_zero() {
            return;
        }

        let entry = CachedSuggestions {
            words: words.to_vec(),
            complete: words.len() < limit,
        };
        let data = match serde_json::to_string(&entry) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to encode autocomplete cache entry: {}", e);
                return;
            }
        };

        if let Err(e) = self
            .policy
            .call(
                Stage::IndexStore,
                self.store.set_ex(cache_key, data, self.cache_ttl),
            )
            .await
        {
            tracing::warn!("Autocomplete cache write failed: {}", e);
        }
    }
}
