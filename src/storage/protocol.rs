//! Index Store Protocol
//!
//! Defines the key layout used inside the index store and the mutation
//! operations that are shipped to it as one pipelined batch.
//!
//! Every indexer operation collects its mutations into a single `Batch` so a
//! reader never sees half of an add/remove sequence.

use serde::{Deserialize, Serialize};

// --- Key Layout ---

/// Prefix of the per-type inverted index keys (`inverted:{type}:{token}`).
pub const INVERTED_PREFIX: &str = "inverted";
/// Prefix of the per-type hashtag sub-index keys (`hashtag:{type}:{token}`).
pub const HASHTAG_PREFIX: &str = "hashtag";
/// The single lexicographically ordered set holding the autocomplete vocabulary.
pub const AUTOCOMPLETE_ZSET: &str = "autocomplete:zset";
/// Prefix of cached autocomplete results (`autocomplete_cache:{prefix}`).
pub const AUTOCOMPLETE_CACHE_PREFIX: &str = "autocomplete_cache";

pub fn inverted_key(entity_type: &str, token: &str) -> String {
    format!("{}:{}:{}", INVERTED_PREFIX, entity_type, token)
}

pub fn hashtag_key(entity_type: &str, token: &str) -> String {
    format!("{}:{}:{}", HASHTAG_PREFIX, entity_type, token)
}

pub fn autocomplete_cache_key(prefix: &str) -> String {
    format!("{}:{}", AUTOCOMPLETE_CACHE_PREFIX, prefix)
}

// --- Mutations ---

/// A single sorted-set mutation.
///
/// Both variants are idempotent: re-adding a member overwrites its score,
/// removing a non-member does nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexOp {
    AddMember {
        key: String,
        member: String,
        score: f64,
    },
    RemoveMember {
        key: String,
        member: String,
    },
}

impl IndexOp {
    pub fn key(&self) -> &str {
        match self {
            IndexOp::AddMember { key, .. } | IndexOp::RemoveMember { key, .. } => key,
        }
    }
}

/// An ordered group of mutations applied as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    ops: Vec<IndexOp>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: String, member: &str, score: f64) {
        self.ops.push(IndexOp::AddMember {
            key,
            member: member.to_string(),
            score,
        });
    }

    pub fn remove(&mut self, key: String, member: &str) {
        self.ops.push(IndexOp::RemoveMember {
            key,
            member: member.to_string(),
        });
    }

    pub fn ops(&self) -> &[IndexOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
