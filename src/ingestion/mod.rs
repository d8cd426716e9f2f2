//! Ingestion Module
//!
//! The write side of the system. Upstream services publish change events after
//! their own writes; this module carries them to the `Indexer`.
//!
//! ## Workflow
//! 1. **Submit**: `POST /api/v1/emitted` validates the event and publishes the
//!    raw body on the feed topic.
//! 2. **Consume**: the `IngestionWorker` receives each payload, decodes it and
//!    drops anything malformed.
//! 3. **Index**: valid events go to the `Indexer` one at a time.

pub mod feed;
pub mod handlers;
pub mod types;
pub mod worker;

#[cfg(test)]
mod tests;
