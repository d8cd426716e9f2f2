//! Content Search Library
//!
//! Indexing and retrieval engine for user-generated content. Upstream services
//! publish change events; a background worker folds them into an inverted
//! index; the query path ranks and hydrates results behind a per-client rate
//! limiter.
//!
//! ## Architecture Modules
//! - **`index`**: the inverted index, the autocomplete vocabulary, entity
//!   projection and the `Indexer` with diff-based updates.
//! - **`ingestion`**: change-event types, the change feed and the worker that
//!   consumes it.
//! - **`ratelimit`**: token buckets per client identity and the HTTP layer
//!   that enforces them.
//! - **`search`**: tokenizer, retrieval and ranking, and the query endpoints.
//! - **`storage`**: store contracts, in-memory backends, key layout and the
//!   timeout/retry policy every store call goes through.
//! - **`service`** and **`app`**: the facade the HTTP layer calls and the code
//!   that wires everything together from a `Config`.

pub mod app;
pub mod config;
pub mod error;
pub mod index;
pub mod ingestion;
pub mod ratelimit;
pub mod search;
pub mod service;
pub mod storage;
