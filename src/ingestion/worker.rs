//! Ingestion Worker
//!
//! A single long-lived consumer of the change feed. Each message is decoded
//! and handed to the `Indexer` synchronously, one at a time.
//!
//! ## Failure Policy
//! - **Poison messages** (undecodable or invalid) are logged and dropped.
//! - **Indexer failures** are logged and the loop moves on; delivery is
//!   at-most-once from the worker's point of view.

use super::feed::ChangeFeed;
use super::types::ChangeEvent;
use crate::error::Result;
use crate::index::indexer::Indexer;
use crate::index::types::IndexOutcome;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct IngestionWorker {
    feed: Arc<dyn ChangeFeed>,
    topic: String,
    indexer: Arc<Indexer>,
    stats: WorkerStats,
}

/// Running totals, read by tests and the periodic log line.
#[derive(Debug, Default)]
pub struct WorkerStats {
    pub processed: AtomicU64,
    pub dropped: AtomicU64,
    pub failed: AtomicU64,
}

impl IngestionWorker {
    pub fn new(feed: Arc<dyn ChangeFeed>, topic: &str, indexer: Arc<Indexer>) -> Arc<Self> {
        Arc::new(Self {
            feed,
            topic: topic.to_string(),
            indexer,
            stats: WorkerStats::default(),
        })
    }

    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Subscribes and spawns the consume loop. Subscribing happens before this
    /// returns, so events published afterwards are not missed.
    pub async fn start(self: Arc<Self>) -> Result<tokio::task::JoinHandle<()>> {
        let mut subscription = self.feed.subscribe(&self.topic).await?;
        tracing::info!("Ingestion worker listening on '{}'", self.topic);

        Ok(tokio::spawn(async move {
            while let Some(payload) = subscription.recv().await {
                self.process(&payload).await;
            }
            tracing::info!("Feed '{}' closed, ingestion worker stopping", self.topic);
        }))
    }

    /// Handles one raw payload. Never fails: every error is logged and counted.
    pub async fn process(&self, payload: &str) -> Option<IndexOutcome> {
        let event = match ChangeEvent::parse(payload) {
            Ok(event) => event,
            Err(e) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Dropping malformed change event: {}", e);
                return None;
            }
        };

        match self.indexer.handle(&event).await {
            Ok(outcome) => {
                self.stats.processed.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    "Processed {} {}/{}: {:?}",
                    event.method,
                    event.entity_type,
                    event.entity_id,
                    outcome
                );
                Some(outcome)
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    "Indexing {} {}/{} failed: {}",
                    event.method,
                    event.entity_type,
                    event.entity_id,
                    e
                );
                None
            }
        }
    }
}
