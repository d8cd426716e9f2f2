//! Timeout and retry policy for store calls.
//!
//! Every index-store, snapshot-store and source-store call goes through a
//! `StorePolicy`. Reads get a deadline only; writes get a deadline and a small
//! bounded number of retries with fixed backoff.

use crate::config::StorePolicyConfig;
use crate::error::{Error, Result, Stage};

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct StorePolicy {
    timeout: Duration,
    write_attempts: usize,
    write_backoff: Duration,
}

impl StorePolicy {
    pub fn new(timeout: Duration, write_attempts: usize, write_backoff: Duration) -> Self {
        Self {
            timeout,
            write_attempts: write_attempts.max(1),
            write_backoff,
        }
    }

    pub fn from_config(config: &StorePolicyConfig) -> Self {
        Self::new(
            config.timeout(),
            config.write_attempts,
            config.write_backoff(),
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs `call` under the deadline. On expiry the call is abandoned and its
    /// effect on the store is unknown.
    pub async fn call<T, F>(&self, stage: Stage, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                stage,
                after: self.timeout,
            }),
        }
    }

    /// Like [`StorePolicy::call`], but re-issues the call on transient failures.
    /// Only idempotent operations may be passed here.
    pub async fn call_with_retry<T, F, Fut>(&self, stage: Stage, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;

        loop {
            match self.call(stage, call()).await {
                Err(e) if e.is_transient() && attempt < self.write_attempts => {
                    tracing::warn!(
                        "{} call failed (attempt {}/{}): {}",
                        stage,
                        attempt,
                        self.write_attempts,
                        e
                    );
                    tokio::time::sleep(self.backoff()).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn backoff(&self) -> Duration {
        if self.write_backoff.is_zero() {
            return self.write_backoff;
        }
        // Small jitter so retrying writers do not line up.
        let jitter = rand::random::<u64>() % 50;
        self.write_backoff + Duration::from_millis(jitter)
    }
}

impl Default for StorePolicy {
    fn default() -> Self {
        Self::from_config(&StorePolicyConfig::default())
    }
}
