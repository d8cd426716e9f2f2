//! Component wiring.
//!
//! Builds every component from one `Config` and the three store backends.
//! The binary and the integration-style tests both start here.

use crate::config::Config;
use crate::error::Result;
use crate::index::autocomplete::AutocompleteIndex;
use crate::index::indexer::Indexer;
use crate::index::inverted::InvertedIndex;
use crate::index::projector::{EntityProjector, ProjectorRegistry};
use crate::ingestion::feed::{ChangeFeed, MemoryFeed};
use crate::ingestion::worker::IngestionWorker;
use crate::ratelimit::limiter::RateLimiter;
use crate::search::engine::Retriever;
use crate::service::SearchService;
use crate::storage::memory::{MemoryIndexStore, MemorySnapshotStore};
use crate::storage::policy::StorePolicy;
use crate::storage::store::{IndexStore, SnapshotStore, SourceStore};

use std::sync::Arc;

pub struct App {
    pub config: Config,
    pub indexer: Arc<Indexer>,
    pub service: Arc<SearchService>,
    pub limiter: Arc<RateLimiter>,
    pub feed: Arc<dyn ChangeFeed>,
    pub worker: Arc<IngestionWorker>,
}

impl App {
    pub fn new(
        config: Config,
        index_store: Arc<dyn IndexStore>,
        snapshots: Arc<dyn SnapshotStore>,
        source: Arc<dyn SourceStore>,
        registry: Arc<ProjectorRegistry>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        let policy = StorePolicy::from_config(&config.store);

        let inverted = InvertedIndex::new(index_store.clone(), policy.clone());
        let autocomplete = AutocompleteIndex::new(
            index_store,
            policy.clone(),
            config.autocomplete.cache_ttl(),
        );
        let projector = EntityProjector::new(source, registry.clone(), policy.clone());

        let indexer = Indexer::new(
            inverted.clone(),
            autocomplete.clone(),
            snapshots.clone(),
            projector,
            policy.clone(),
        );
        let retriever = Retriever::new(inverted, snapshots, policy);
        let limiter = RateLimiter::new(config.rate_limit.clone());

        let service = SearchService::new(
            retriever,
            autocomplete,
            registry,
            feed.clone(),
            &config.feed_topic,
            limiter.clone(),
            config.search.clone(),
            config.autocomplete.clone(),
        );
        let worker = IngestionWorker::new(feed.clone(), &config.feed_topic, indexer.clone());

        Self {
            config,
            indexer,
            service,
            limiter,
            feed,
            worker,
        }
    }

    /// Everything in process: memory index, snapshot store and feed.
    pub fn in_memory(
        config: Config,
        source: Arc<dyn SourceStore>,
        registry: Arc<ProjectorRegistry>,
    ) -> Self {
        Self::new(
            config,
            MemoryIndexStore::new(),
            MemorySnapshotStore::new(),
            source,
            registry,
            MemoryFeed::new(),
        )
    }

    /// Starts the ingestion worker. It is subscribed by the time this returns.
    pub async fn spawn_worker(&self) -> Result<tokio::task::JoinHandle<()>> {
        self.worker.clone().start().await
    }
}
