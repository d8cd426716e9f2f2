//! Change Feed
//!
//! The topic-based channel change events travel on between the submit
//! endpoint (or any upstream service) and the ingestion worker.

use crate::error::{Error, Result};

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Messages buffered per topic before slow subscribers start losing them.
const TOPIC_CAPACITY: usize = 1024;

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Publishes a raw JSON payload; returns how many subscribers received it.
    async fn publish(&self, topic: &str, payload: String) -> Result<usize>;

    async fn subscribe(&self, topic: &str) -> Result<Box<dyn FeedSubscription>>;
}

#[async_trait]
pub trait FeedSubscription: Send {
    /// Waits for the next payload. `None` means the feed is closed.
    async fn recv(&mut self) -> Option<String>;
}

/// In-process feed with one broadcast channel per topic.
#[derive(Default)]
pub struct MemoryFeed {
    topics: DashMap<String, broadcast::Sender<String>>,
}

impl MemoryFeed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<String> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone()
    }

    /// Drops the topic's channel; subscribers drain what is buffered and then
    /// see the feed as closed.
    pub fn close(&self, topic: &str) {
        self.topics.remove(topic);
    }
}

#[async_trait]
impl ChangeFeed for MemoryFeed {
    async fn publish(&self, topic: &str, payload: String) -> Result<usize> {
        match self.sender(topic).send(payload) {
            Ok(receivers) => Ok(receivers),
            Err(_) => {
                // Pub/sub semantics: with nobody listening the message is gone.
                tracing::warn!("Published to '{}' with no subscribers", topic);
                Ok(0)
            }
        }
    }

    async fn subscribe(&self, topic: &str) -> Result<Box<dyn FeedSubscription>> {
        if topic.is_empty() {
            return Err(Error::Feed("topic name is empty".to_string()));
        }
        Ok(Box::new(MemorySubscription {
            topic: topic.to_string(),
            receiver: self.sender(topic).subscribe(),
        }))
    }
}

struct MemorySubscription {
    topic: String,
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl FeedSubscription for MemorySubscription {
    async fn recv(&mut self) -> Option<String> {
        loop {
            match self.receiver.recv().await {
                Ok(payload) => return Some(payload),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Subscriber on '{}' lagged, {} events lost", self.topic, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
