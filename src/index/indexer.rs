//! Indexer
//!
//! Drives one change event through projection, tokenization, index mutation
//! and the snapshot write.
//!
//! ## Responsibilities
//! - **Create**: tokenize title + description, add every posting and register
//!   every token for autocomplete, then write the snapshot.
//! - **Update**: diff the posting lists the old snapshot belongs to against
//!   the new ones; only the symmetric difference touches the index. Postings
//!   common to both keep their original score.
//! - **Delete**: remove every posting derived from the snapshot, then the
//!   snapshot itself.
//!
//! Index mutations of one operation always go out as a single batch, and the
//! batch is committed before the snapshot is written.

use super::autocomplete::AutocompleteIndex;
use super::inverted::InvertedIndex;
use super::projector::EntityProjector;
use super::types::{IndexOutcome, IndexableEntity};
use crate::error::{Result, Stage};
use crate::ingestion::types::{ChangeEvent, Method};
use crate::search::tokenizer::tokenize;
use crate::storage::policy::StorePolicy;
use crate::storage::protocol::Batch;
use crate::storage::store::SnapshotStore;

use std::collections::HashSet;
use std::sync::Arc;

pub struct Indexer {
    index: InvertedIndex,
    autocomplete: AutocompleteIndex,
    snapshots: Arc<dyn SnapshotStore>,
    projector: EntityProjector,
    policy: StorePolicy,
}

impl Indexer {
    pub fn new(
        index: InvertedIndex,
        autocomplete: AutocompleteIndex,
        snapshots: Arc<dyn SnapshotStore>,
        projector: EntityProjector,
        policy: StorePolicy,
    ) -> Arc<Self> {
        Arc::new(Self {
            index,
            autocomplete,
            snapshots,
            projector,
            policy,
        })
    }

    /// Applies one change event. Projection failures are returned to the
    /// caller; nothing here retries a failed event.
    pub async fn handle(&self, event: &ChangeEvent) -> Result<IndexOutcome> {
        tracing::debug!(
            "Handling {:?} for {}/{}",
            event.method,
            event.entity_type,
            event.entity_id
        );

        match event.method {
            Method::Delete => self.delete_entity(&event.entity_id).await,
            // A create for an id we already hold goes through the diff path so
            // postings from the earlier text do not linger.
            Method::Create | Method::Update => {
                let entity = self
                    .projector
                    .resolve(&event.entity_type, &event.entity_id)
                    .await?;
                self.update_entity_indexes(&entity).await
            }
        }
    }

    /// Indexes `entity` from scratch and writes its snapshot. An entity without
    /// tokens is still snapshotted; it just cannot be found by search.
    pub async fn index_entity(&self, entity: &IndexableEntity) -> Result<IndexOutcome> {
        let tokens = tokenize(&entity.text());

        if tokens.is_empty() {
            tracing::debug!("No tokens for {}, skipping index mutations", entity.id);
        } else {
            let mut batch = Batch::new();
            let score = entity.score();
            for key in InvertedIndex::entity_keys(&entity.entity_type, &tokens) {
                batch.add(key, &entity.id, score);
            }
            AutocompleteIndex::stage_tokens(&mut batch, &tokens);
            self.index.commit(&batch).await?;
        }

        self.save_snapshot(entity).await?;

        tracing::info!("Indexed {}/{} ({} tokens)", entity.entity_type, entity.id, tokens.len());
        Ok(IndexOutcome::Indexed {
            tokens: tokens.len(),
        })
    }

    /// Re-indexes `entity` against its previous snapshot. Falls back to a
    /// fresh index when there is no snapshot.
    pub async fn update_entity_indexes(&self, entity: &IndexableEntity) -> Result<IndexOutcome> {
        let Some(old) = self.load_snapshot(&entity.id).await? else {
            tracing::debug!("No snapshot for {}, indexing as new", entity.id);
            return self.index_entity(entity).await;
        };

        let old_tokens = tokenize(&old.text());
        let new_tokens = tokenize(&entity.text());

        // Keys carry the entity type, so a type change leaves nothing in common.
        let (to_remove, to_add) = set_diff(
            &InvertedIndex::entity_keys(&old.entity_type, &old_tokens),
            &InvertedIndex::entity_keys(&entity.entity_type, &new_tokens),
        );

        if to_remove.is_empty() && to_add.is_empty() {
            self.save_snapshot(entity).await?;
            tracing::debug!("Postings unchanged for {}, rewrote snapshot only", entity.id);
            return Ok(IndexOutcome::Unchanged);
        }

        let mut batch = Batch::new();
        for key in &to_remove {
            batch.remove(key.clone(), &entity.id);
        }
        let score = entity.score();
        for key in &to_add {
            batch.add(key.clone(), &entity.id, score);
        }
        let (_, new_words) = set_diff(&old_tokens, &new_tokens);
        AutocompleteIndex::stage_tokens(&mut batch, &new_words);
        self.index.commit(&batch).await?;

        self.save_snapshot(entity).await?;

        tracing::info!(
            "Updated {}/{} (+{} -{} postings)",
            entity.entity_type,
            entity.id,
            to_add.len(),
            to_remove.len()
        );
        Ok(IndexOutcome::Updated {
            added: to_add.len(),
            removed: to_remove.len(),
        })
    }

    /// Removes `id` from every posting list its snapshot text produced, then
    /// deletes the snapshot. Deleting an unknown id succeeds.
    pub async fn delete_entity(&self, id: &str) -> Result<IndexOutcome> {
        let Some(old) = self.load_snapshot(id).await? else {
            tracing::debug!("Delete of {} with no snapshot, nothing to do", id);
            return Ok(IndexOutcome::AlreadyAbsent);
        };

        let tokens = tokenize(&old.text());
        let mut batch = Batch::new();
        for key in InvertedIndex::entity_keys(&old.entity_type, &tokens) {
            batch.remove(key, id);
        }
        self.index.commit(&batch).await?;

        let snapshots = &self.snapshots;
        self.policy
            .call_with_retry(Stage::SnapshotStore, move || snapshots.delete_by_id(id))
            .await?;

        tracing::info!("Deleted {}/{} ({} tokens)", old.entity_type, id, tokens.len());
        Ok(IndexOutcome::Deleted {
            tokens: tokens.len(),
        })
    }

    async fn load_snapshot(&self, id: &str) -> Result<Option<IndexableEntity>> {
        let snapshots = &self.snapshots;
        self.policy
            .call_with_retry(Stage::SnapshotStore, move || snapshots.find_by_id(id))
            .await
    }

    async fn save_snapshot(&self, entity: &IndexableEntity) -> Result<()> {
        let snapshots = &self.snapshots;
        self.policy
            .call_with_retry(Stage::SnapshotStore, move || snapshots.upsert(entity))
            .await
    }
}

/// Entries only in `old` and entries only in `new`, each in first-seen order.
pub fn set_diff(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let old_set: HashSet<&String> = old.iter().collect();
    let new_set: HashSet<&String> = new.iter().collect();

    let to_remove = old
        .iter()
        .filter(|t| !new_set.contains(t))
        .cloned()
        .collect();
    let to_add = new
        .iter()
        .filter(|t| !old_set.contains(t))
        .cloned()
        .collect();

    (to_remove, to_add)
}
