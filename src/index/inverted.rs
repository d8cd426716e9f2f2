//! Inverted Index
//!
//! Maps `(entity type, token)` to the set of entity ids whose text contains
//! the token, ordered by recency. A hashtag is recorded in the hashtag
//! sub-index under `#tag` and in the plain index under its bare word, so a
//! plain query for `golang` also finds text tagged `#golang`.
//!
//! Mutations are staged into a `Batch` by the indexer and committed once per
//! logical operation; the single-posting helpers exist for callers that only
//! need one change.

use super::types::Posting;
use crate::error::{Result, Stage};
use crate::search::tokenizer::HASHTAG_PREFIX;
use crate::storage::policy::StorePolicy;
use crate::storage::protocol::{Batch, hashtag_key, inverted_key};
use crate::storage::store::{IndexStore, touched_keys};

use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct InvertedIndex {
    store: Arc<dyn IndexStore>,
    policy: StorePolicy,
}

impl InvertedIndex {
    pub fn new(store: Arc<dyn IndexStore>, policy: StorePolicy) -> Self {
        Self { store, policy }
    }

    /// Posting lists an entity joins because its text contains `token`.
    pub fn posting_keys(entity_type: &str, token: &str) -> Vec<String> {
        match token.strip_prefix(HASHTAG_PREFIX) {
            Some(word) => vec![
                inverted_key(entity_type, word),
                hashtag_key(entity_type, token),
            ],
            None => vec![inverted_key(entity_type, token)],
        }
    }

    /// Every posting list an entity with `tokens` belongs to, once each, in
    /// first-seen order. `golang` and `#golang` share the plain key.
    pub fn entity_keys(entity_type: &str, tokens: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        tokens
            .iter()
            .flat_map(|token| Self::posting_keys(entity_type, token))
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }

    pub fn stage_add(batch: &mut Batch, entity_type: &str, token: &str, entity_id: &str, score: f64) {
        for key in Self::posting_keys(entity_type, token) {
            batch.add(key, entity_id, score);
        }
    }

    pub fn stage_remove(batch: &mut Batch, entity_type: &str, token: &str, entity_id: &str) {
        for key in Self::posting_keys(entity_type, token) {
            batch.remove(key, entity_id);
        }
    }

    /// Sends `batch` to the store as one pipelined unit, retrying transient
    /// failures. Every staged op is idempotent, so a retry after an unknown
    /// outcome is safe.
    pub async fn commit(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let store = &self.store;
        self.policy
            .call_with_retry(Stage::IndexStore, move || store.apply(batch))
            .await?;

        tracing::debug!(
            "Committed {} index ops across {} keys",
            batch.len(),
            touched_keys(batch)
        );
        Ok(())
    }

    pub async fn add_to_index(
        &self,
        entity_type: &str,
        token: &str,
        entity_id: &str,
        score: f64,
    ) -> Result<()> {
        let mut batch = Batch::new();
        Self::stage_add(&mut batch, entity_type, token, entity_id, score);
        self.commit(&batch).await
    }

    pub async fn remove_from_index(&self, entity_type: &str, token: &str, entity_id: &str) -> Result<()> {
        let mut batch = Batch::new();
        Self::stage_remove(&mut batch, entity_type, token, entity_id);
        self.commit(&batch).await
    }

    /// Entity ids containing `token`, most recent first.
    pub async fn query_token(&self, entity_type: &str, token: &str) -> Result<Vec<String>> {
        Ok(self
            .postings(entity_type, token)
            .await?
            .into_iter()
            .map(|posting| posting.entity_id)
            .collect())
    }

    /// Posting list of `token` with scores, most recent first. A hashtag reads
    /// the hashtag sub-index. Reads are never retried.
    pub async fn postings(&self, entity_type: &str, token: &str) -> Result<Vec<Posting>> {
        let key = if token.starts_with(HASHTAG_PREFIX) {
            hashtag_key(entity_type, token)
        } else {
            inverted_key(entity_type, token)
        };
        self.read(key).await
    }

    async fn read(&self, key: String) -> Result<Vec<Posting>> {
        let members = self
            .policy
            .call(Stage::IndexStore, self.store.range_by_score_desc(&key))
            .await?;

        tracing::trace!("Read {} postings for {}", members.len(), key);

        Ok(members
            .into_iter()
            .map(|(entity_id, score)| Posting { entity_id, score })
            .collect())
    }
}
