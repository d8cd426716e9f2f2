use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized projection of any domain record.
///
/// This is also the snapshot shape: the copy persisted after indexing and
/// returned from hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexableEntity {
    #[serde(rename = "entityid")]
    pub id: String,
    #[serde(rename = "entitytype")]
    pub entity_type: String,
    pub title: String,
    pub description: String,
    /// Opaque reference, never tokenized.
    #[serde(default)]
    pub image: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl IndexableEntity {
    pub fn new(
        id: impl Into<String>,
        entity_type: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            entity_type: entity_type.into(),
            title: title.into(),
            description: description.into(),
            image: String::new(),
            created_at,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = image.into();
        self
    }

    /// The text that gets tokenized: title and description.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
            .trim()
            .to_string()
    }

    /// Recency score used for postings: nanoseconds since the epoch.
    pub fn score(&self) -> f64 {
        match self.created_at.timestamp_nanos_opt() {
            Some(nanos) => nanos as f64,
            // Outside the i64 nanosecond range (before 1677 or after 2262).
            None => self.created_at.timestamp_micros() as f64 * 1_000.0,
        }
    }
}

/// One `(entity id, recency score)` pairing read back from a token's posting list.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub entity_id: String,
    pub score: f64,
}

/// What an indexing operation did, reported back to the worker for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// First index of an entity.
    Indexed { tokens: usize },
    /// Posting lists joined and left.
    Updated { added: usize, removed: usize },
    /// Token sets were identical; only the snapshot was rewritten.
    Unchanged,
    Deleted { tokens: usize },
    /// Delete of an entity that has no snapshot.
    AlreadyAbsent,
}
