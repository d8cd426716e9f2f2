//! Error taxonomy shared by every subsystem.
//!
//! Each variant names the stage that failed so callers (the HTTP layer, the
//! ingestion worker) can decide whether to retry, log and drop, or report.

use std::fmt;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// The external collaborator an operation was talking to when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    SourceStore,
    IndexStore,
    SnapshotStore,
    Feed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::SourceStore => "source store",
            Stage::IndexStore => "index store",
            Stage::SnapshotStore => "snapshot store",
            Stage::Feed => "change feed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported entity type: {0}")]
    UnsupportedType(String),

    #[error("projection failed for {entity_type}/{entity_id}: {reason}")]
    Projection {
        entity_type: String,
        entity_id: String,
        reason: String,
    },

    #[error("source store error: {0}")]
    SourceStore(String),

    #[error("index store error: {0}")]
    IndexStore(String),

    #[error("snapshot store error: {0}")]
    SnapshotStore(String),

    #[error("change feed error: {0}")]
    Feed(String),

    #[error("{stage} call timed out after {after:?}")]
    Timeout { stage: Stage, after: Duration },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed change event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

impl Error {
    /// Timeouts and backend failures may succeed when repeated; the outcome of
    /// a timed-out mutation is unknown, which is why every mutation is idempotent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Timeout { .. }
                | Error::SourceStore(_)
                | Error::IndexStore(_)
                | Error::SnapshotStore(_)
                | Error::Feed(_)
        )
    }

    pub fn projection(entity_type: &str, entity_id: &str, reason: impl Into<String>) -> Self {
        Error::Projection {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            reason: reason.into(),
        }
    }
}
