//! Runtime configuration.
//!
//! Every component receives the slice of configuration it needs at construction
//! time; nothing reads global state.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_FEED_TOPIC: &str = "indexing-events";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bind: SocketAddr,
    pub feed_topic: String,
    pub store: StorePolicyConfig,
    pub rate_limit: RateLimitConfig,
    pub autocomplete: AutocompleteConfig,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 7000)),
            feed_topic: DEFAULT_FEED_TOPIC.to_string(),
            store: StorePolicyConfig::default(),
            rate_limit: RateLimitConfig::default(),
            autocomplete: AutocompleteConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

/// Timeout and retry settings for index-store and snapshot-store calls.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorePolicyConfig {
    pub timeout_ms: u64,
    pub write_attempts: usize,
    pub write_backoff_ms: u64,
}

impl Default for StorePolicyConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 500,
            write_attempts: 3,
            write_backoff_ms: 150,
        }
    }
}

impl StorePolicyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn write_backoff(&self) -> Duration {
        Duration::from_millis(self.write_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Steady refill rate, tokens per second.
    pub rate_per_sec: f64,
    pub burst: u32,
    pub idle_ttl_secs: u64,
    /// Identities tracked at once before new ones share the fallback bucket.
    pub max_identities: usize,
    pub fallback_rate_per_sec: f64,
    pub fallback_burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_per_sec: 10.0,
            burst: 20,
            idle_ttl_secs: 300,
            max_identities: 10_000,
            fallback_rate_per_sec: 0.1,
            fallback_burst: 1,
        }
    }
}

impl RateLimitConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutocompleteConfig {
    pub cache_ttl_secs: u64,
    pub default_limit: usize,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            default_limit: 20,
        }
    }
}

impl AutocompleteConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
        }
    }
}

impl SearchConfig {
    /// Zero or absent means "use the default"; anything above the cap is clamped.
    pub fn effective_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.default_limit,
            Some(limit) => limit.min(self.max_limit),
        }
    }
}
