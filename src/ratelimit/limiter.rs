use super::bucket::TokenBucket;
use crate::config::RateLimitConfig;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::Instant;

struct TrackedBucket {
    bucket: TokenBucket,
    last_seen: Instant,
}

struct LimiterState {
    buckets: HashMap<String, TrackedBucket>,
    /// Shared by every identity that arrives once `max_identities` is reached.
    fallback: TokenBucket,
}

/// Per-identity token-bucket admission control.
///
/// Buckets are created on first sight of an identity. Each one gets its own
/// eviction timer that drops it after `idle_ttl` without traffic. `allow`
/// never fails.
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Arc<Self> {
        let fallback = TokenBucket::new(config.fallback_rate_per_sec, config.fallback_burst);
        Arc::new(Self {
            config,
            state: Mutex::new(LimiterState {
                buckets: HashMap::new(),
                fallback,
            }),
        })
    }

    /// Spends one token from `identity`'s bucket. `false` means the caller is
    /// over its rate and should be told so.
    pub fn allow(self: &Arc<Self>, identity: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock();

        if let Some(tracked) = state.buckets.get_mut(identity) {
            tracked.last_seen = now;
            return tracked.bucket.try_acquire_at(now);
        }

        if state.buckets.len() >= self.config.max_identities {
            tracing::debug!("Identity cap reached, {} uses the fallback bucket", identity);
            return state.fallback.try_acquire_at(now);
        }

        let mut bucket = TokenBucket::new(self.config.rate_per_sec, self.config.burst);
        let allowed = bucket.try_acquire_at(now);
        state.buckets.insert(
            identity.to_string(),
            TrackedBucket {
                bucket,
                last_seen: now,
            },
        );
        drop(state);

        self.schedule_eviction(identity.to_string());
        allowed
    }

    /// Number of identities with their own bucket.
    pub fn tracked(&self) -> usize {
        self.state.lock().buckets.len()
    }

    fn schedule_eviction(self: &Arc<Self>, identity: String) {
        // Outside a runtime there is nothing to run timers on; the cap still
        // bounds the map.
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        let limiter: Weak<Self> = Arc::downgrade(self);
        let mut wait = self.config.idle_ttl();

        handle.spawn(async move {
            loop {
                tokio::time::sleep(wait).await;
                let Some(limiter) = limiter.upgrade() else {
                    return;
                };
                match limiter.evict_if_idle(&identity) {
                    Some(remaining) => wait = remaining,
                    None => return,
                }
            }
        });
    }

    /// Removes the bucket if it has been idle for the full TTL. Returns how
    /// much longer to wait when it is still in use.
    fn evict_if_idle(&self, identity: &str) -> Option<Duration> {
        let ttl = self.config.idle_ttl();
        let mut state = self.state.lock();
        let tracked = state.buckets.get(identity)?;

        let idle = Instant::now().saturating_duration_since(tracked.last_seen);
        if idle >= ttl {
            state.buckets.remove(identity);
            tracing::debug!("Evicted idle rate-limit bucket for {}", identity);
            None
        } else {
            Some(ttl - idle)
        }
    }
}
