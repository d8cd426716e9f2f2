use crate::error::{Result, Stage};
use crate::index::inverted::InvertedIndex;
use crate::index::types::{IndexableEntity, Posting};
use crate::search::tokenizer::{is_hashtag, tokenize};
use crate::storage::policy::StorePolicy;
use crate::storage::store::SnapshotStore;

use futures::future::try_join_all;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Points a candidate earns per matching plain token in boosted mode.
pub const PLAIN_TOKEN_WEIGHT: u32 = 3;
/// Points a candidate earns per matching hashtag in boosted mode.
pub const HASHTAG_WEIGHT: u32 = 7;

/// A ranked entity id with the score it was ranked by.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedId {
    pub entity_id: String,
    pub score: u32,
}

/// A hydrated search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub entity: IndexableEntity,
    pub score: u32,
}

/// Read path: query tokens -> posting fan-out -> ranking -> hydration.
#[derive(Clone)]
pub struct Retriever {
    index: InvertedIndex,
    snapshots: Arc<dyn SnapshotStore>,
    policy: StorePolicy,
}

impl Retriever {
    pub fn new(index: InvertedIndex, snapshots: Arc<dyn SnapshotStore>, policy: StorePolicy) -> Self {
        Self {
            index,
            snapshots,
            policy,
        }
    }

    /// Ranked, hydrated results for `query` within `entity_type`.
    pub async fn search(&self, entity_type: &str, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let ranked = self.rank(entity_type, query, limit).await?;
        if ranked.is_empty() {
            return Ok(Vec::new());
        }

        let hits = self.hydrate(entity_type, ranked).await?;
        tracing::debug!("Search '{}' in {} -> {} hits", query, entity_type, hits.len());
        Ok(hits)
    }

    /// Ranked ids without hydration. A `#` anywhere in the raw query selects
    /// hashtag-boosted ranking; otherwise every token must match.
    pub async fn rank(&self, entity_type: &str, query: &str, limit: usize) -> Result<Vec<RankedId>> {
        let tokens = tokenize(query);
        if tokens.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        if query.contains('#') {
            self.boosted(entity_type, &tokens, limit).await
        } else {
            self.intersection(entity_type, &tokens, limit).await
        }
    }

    async fn intersection(&self, entity_type: &str, tokens: &[String], limit: usize) -> Result<Vec<RankedId>> {
        let lists = try_join_all(
            tokens
                .iter()
                .map(|token| self.index.postings(entity_type, token)),
        )
        .await?;

        let score = PLAIN_TOKEN_WEIGHT * tokens.len() as u32;
        Ok(intersect_postings(lists, limit)
            .into_iter()
            .map(|entity_id| RankedId { entity_id, score })
            .collect())
    }

    async fn boosted(&self, entity_type: &str, tokens: &[String], limit: usize) -> Result<Vec<RankedId>> {
        let lists = try_join_all(
            tokens
                .iter()
                .map(|token| self.index.postings(entity_type, token)),
        )
        .await?;

        let matches: Vec<TokenMatches> = tokens
            .iter()
            .zip(lists)
            .map(|(token, postings)| TokenMatches {
                hashtag: is_hashtag(token),
                postings,
            })
            .collect();

        Ok(rank_boosted(&matches, limit))
    }

    /// Looks the ranked ids up in bulk and restores rank order. Ids without a
    /// snapshot are dropped.
    async fn hydrate(&self, entity_type: &str, ranked: Vec<RankedId>) -> Result<Vec<SearchHit>> {
        let ids: Vec<String> = ranked.iter().map(|r| r.entity_id.clone()).collect();
        let found = self
            .policy
            .call(
                Stage::SnapshotStore,
                self.snapshots.find_many_by_ids_and_type(&ids, entity_type),
            )
            .await?;

        let mut by_id: HashMap<String, IndexableEntity> = found
            .into_iter()
            .map(|entity| (entity.id.clone(), entity))
            .collect();

        Ok(ranked
            .into_iter()
            .filter_map(|r| {
                by_id.remove(&r.entity_id).map(|entity| SearchHit {
                    entity,
                    score: r.score,
                })
            })
            .collect())
    }
}

/// AND semantics: ids present in every list. The smallest list drives the
/// walk, so the result keeps its recency order. Any empty list empties the
/// result.
pub fn intersect_postings(lists: Vec<Vec<Posting>>, limit: usize) -> Vec<String> {
    if lists.is_empty() || lists.iter().any(|list| list.is_empty()) {
        return Vec::new();
    }

    let mut lists = lists;
    // Stable: among equally small lists the earlier query token leads.
    lists.sort_by_key(|list| list.len());
    let mut lists = lists.into_iter();
    let Some(base) = lists.next() else {
        return Vec::new();
    };

    let others: Vec<HashSet<String>> = lists
        .map(|list| list.into_iter().map(|p| p.entity_id).collect())
        .collect();

    base.into_iter()
        .map(|p| p.entity_id)
        .filter(|id| others.iter().all(|set| set.contains(id)))
        .take(limit)
        .collect()
}

/// Posting list of one query token, tagged with the token class.
#[derive(Debug, Clone)]
pub struct TokenMatches {
    pub hashtag: bool,
    pub postings: Vec<Posting>,
}

/// OR semantics with weights: each plain-token match is worth
/// `PLAIN_TOKEN_WEIGHT`, each hashtag match `HASHTAG_WEIGHT`. Ties go to the
/// more recent posting under the first query token, then to the smaller id.
/// `matches` must be in query-token order.
pub fn rank_boosted(matches: &[TokenMatches], limit: usize) -> Vec<RankedId> {
    let mut scores: HashMap<&str, u32> = HashMap::new();
    for token in matches {
        let weight = if token.hashtag {
            HASHTAG_WEIGHT
        } else {
            PLAIN_TOKEN_WEIGHT
        };
        for posting in &token.postings {
            *scores.entry(posting.entity_id.as_str()).or_insert(0) += weight;
        }
    }

    let recency: HashMap<&str, f64> = matches
        .first()
        .map(|first| {
            first
                .postings
                .iter()
                .map(|p| (p.entity_id.as_str(), p.score))
                .collect()
        })
        .unwrap_or_default();

    let mut ranked: Vec<(&str, u32)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| compare_recency(recency.get(a.0), recency.get(b.0)))
            .then_with(|| a.0.cmp(b.0))
    });

    ranked
        .into_iter()
        .take(limit)
        .map(|(id, score)| RankedId {
            entity_id: id.to_string(),
            score,
        })
        .collect()
}

/// More recent first; candidates absent from the first token's list sort after
/// those present in it.
fn compare_recency(a: Option<&f64>, b: Option<&f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
