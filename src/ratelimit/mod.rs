//! Rate Limiting Module
//!
//! Per-client admission control in front of the search endpoint.
//!
//! ## Mechanism
//! - **Token Bucket**: every client identity owns a bucket with a steady
//!   refill rate and a burst capacity.
//! - **Lazy Tracking**: buckets appear on first request and disappear after an
//!   idle TTL, each driven by its own timer.
//! - **Identity Cap**: past `max_identities`, unseen clients share one harsh
//!   fallback bucket instead of allocating more state.
//!
//! ## Submodules
//! - **`bucket`**: the token bucket itself.
//! - **`limiter`**: the identity map, eviction timers and the fallback.
//! - **`middleware`**: identity extraction and the Axum layer returning 429.

pub mod bucket;
pub mod limiter;
pub mod middleware;
