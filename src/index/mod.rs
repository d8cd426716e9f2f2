//! Indexing Module
//!
//! Owns the write side of search: turning change events into postings.
//!
//! ## Submodules
//! - **`types`**: `IndexableEntity` (also the snapshot shape), postings and outcomes.
//! - **`projector`**: registry of per-type projectors from source records to entities.
//! - **`inverted`**: token -> entity id posting lists, partitioned by entity type.
//! - **`autocomplete`**: token vocabulary with cached prefix lookups.
//! - **`indexer`**: create / diff-based update / delete orchestration.

pub mod autocomplete;
pub mod indexer;
pub mod inverted;
pub mod projector;
pub mod types;
