//! Storage Module
//!
//! Contracts and in-memory backends for everything the indexing core persists.
//!
//! ## Core Concepts
//! - **Index Store**: sorted sets keyed by token (`inverted:*`, `hashtag:*`) plus
//!   the autocomplete vocabulary and a small TTL cache. Mutations are pipelined
//!   through a `Batch`.
//! - **Snapshot Store**: last-indexed copy of every entity, used for diffing on
//!   update and for hydrating search results.
//! - **Source Store**: the host's document store, read once per change event.
//! - **Policy**: deadlines on every call, bounded retries on the write path.

pub mod memory;
pub mod policy;
pub mod protocol;
pub mod store;

#[cfg(test)]
mod tests;
