//! Store contracts consumed by the indexing core.
//!
//! The core never talks to a concrete database. The host hands it
//! implementations of these traits at construction time.

use super::protocol::{Batch, IndexOp};
use crate::error::Result;
use crate::index::types::IndexableEntity;

use async_trait::async_trait;
use std::time::Duration;

/// A key-value store with sorted-set semantics.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// All members of `key` with their scores, highest score first.
    /// An unknown key yields an empty list.
    async fn range_by_score_desc(&self, key: &str) -> Result<Vec<(String, f64)>>;

    /// Members of `key` in the closed-open lexicographic range `[min, max)`,
    /// at most `limit` of them.
    async fn range_by_lex(&self, key: &str, min: &str, max: &str, limit: usize)
    -> Result<Vec<String>>;

    /// Applies every operation of `batch` as one pipelined unit.
    async fn apply(&self, batch: &Batch) -> Result<()>;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    async fn add_member(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut batch = Batch::new();
        batch.add(key.to_string(), member, score);
        self.apply(&batch).await
    }

    async fn remove_member(&self, key: &str, member: &str) -> Result<()> {
        let mut batch = Batch::new();
        batch.remove(key.to_string(), member);
        self.apply(&batch).await
    }
}

/// Durable collection of the last-indexed copy of each entity, keyed by id.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn upsert(&self, entity: &IndexableEntity) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<IndexableEntity>>;

    async fn delete_by_id(&self, id: &str) -> Result<()>;

    /// Snapshots whose id is in `ids` and whose type equals `entity_type`.
    /// Order of the returned records is unspecified.
    async fn find_many_by_ids_and_type(
        &self,
        ids: &[String],
        entity_type: &str,
    ) -> Result<Vec<IndexableEntity>>;
}

/// The host application's primary document store.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn fetch(&self, entity_type: &str, id: &str) -> Result<Option<serde_json::Value>>;
}

/// Counts the distinct keys a batch touches; used for log lines.
pub fn touched_keys(batch: &Batch) -> usize {
    let mut keys: Vec<&str> = batch.ops().iter().map(IndexOp::key).collect();
    keys.sort_unstable();
    keys.dedup();
    keys.len()
}
