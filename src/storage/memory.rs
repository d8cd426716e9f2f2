use super::protocol::{Batch, IndexOp};
use super::store::{IndexStore, SnapshotStore, SourceStore};
use crate::error::Result;
use crate::index::types::IndexableEntity;

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

type SortedSet = BTreeMap<String, f64>;

/// In-process sorted-set store.
///
/// All sorted sets live behind one `RwLock`: a batch takes the write lock once
/// and applies every operation before releasing it, so readers observe either
/// none or all of a batch.
pub struct MemoryIndexStore {
    sets: RwLock<HashMap<String, SortedSet>>,
    values: DashMap<String, (String, Instant)>,
}

impl MemoryIndexStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn key_count(&self) -> usize {
        self.sets.read().await.len()
    }

    pub async fn members(&self, key: &str) -> Vec<String> {
        self.sets
            .read()
            .await
            .get(key)
            .map(|set| set.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn score(&self, key: &str, member: &str) -> Option<f64> {
        let sets = self.sets.read().await;
        sets.get(key).and_then(|set| set.get(member).copied())
    }

    fn apply_op(sets: &mut HashMap<String, SortedSet>, op: &IndexOp) {
        match op {
            IndexOp::AddMember { key, member, score } => {
                sets.entry(key.clone())
                    .or_default()
                    .insert(member.clone(), *score);
            }
            IndexOp::RemoveMember { key, member } => {
                if let Some(set) = sets.get_mut(key) {
                    set.remove(member);
                    // An emptied sorted set disappears, as in Redis.
                    if set.is_empty() {
                        sets.remove(key);
                    }
                }
            }
        }
    }
}

impl Default for MemoryIndexStore {
    fn default() -> Self {
        Self {
            sets: RwLock::new(HashMap::new()),
            values: DashMap::new(),
        }
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn range_by_score_desc(&self, key: &str) -> Result<Vec<(String, f64)>> {
        let sets = self.sets.read().await;
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(String, f64)> = set
            .iter()
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        // Equal scores fall back to reverse lexicographic order, like ZREVRANGE.
        members.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        Ok(members)
    }

    async fn range_by_lex(
        &self,
        key: &str,
        min: &str,
        max: &str,
        limit: usize,
    ) -> Result<Vec<String>> {
        if limit == 0 || min >= max {
            return Ok(Vec::new());
        }

        let sets = self.sets.read().await;
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };

        Ok(set
            .range::<str, _>((Bound::Included(min), Bound::Excluded(max)))
            .take(limit)
            .map(|(member, _)| member.clone())
            .collect())
    }

    async fn apply(&self, batch: &Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut sets = self.sets.write().await;
        for op in batch.ops() {
            Self::apply_op(&mut sets, op);
        }
        tracing::trace!("Applied batch of {} ops", batch.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let expired = match self.values.get(key) {
            Some(entry) => {
                let (value, expires_at) = entry.value();
                if Instant::now() < *expires_at {
                    return Ok(Some(value.clone()));
                }
                true
            }
            None => false,
        };

        if expired {
            self.values.remove(key);
        }
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.values
            .insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

/// Snapshot collection keyed by entity id.
#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: DashMap<String, IndexableEntity>,
}

impl MemorySnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn upsert(&self, entity: &IndexableEntity) -> Result<()> {
        self.snapshots.insert(entity.id.clone(), entity.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<IndexableEntity>> {
        Ok(self.snapshots.get(id).map(|entry| entry.value().clone()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.snapshots.remove(id);
        Ok(())
    }

    async fn find_many_by_ids_and_type(
        &self,
        ids: &[String],
        entity_type: &str,
    ) -> Result<Vec<IndexableEntity>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.snapshots.get(id))
            .filter(|entry| entry.value().entity_type == entity_type)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

/// Stand-in for the host document store: raw JSON records keyed by `(type, id)`.
#[derive(Default)]
pub struct MemorySourceStore {
    records: DashMap<(String, String), serde_json::Value>,
}

impl MemorySourceStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, entity_type: &str, id: &str, record: serde_json::Value) {
        self.records
            .insert((entity_type.to_string(), id.to_string()), record);
    }

    pub fn remove(&self, entity_type: &str, id: &str) {
        self.records
            .remove(&(entity_type.to_string(), id.to_string()));
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    async fn fetch(&self, entity_type: &str, id: &str) -> Result<Option<serde_json::Value>> {
        Ok(self
            .records
            .get(&(entity_type.to_string(), id.to_string()))
            .map(|entry| entry.value().clone()))
    }
}
