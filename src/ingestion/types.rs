//! Ingestion Data Types
//!
//! The change-event wire contract consumed from the feed and accepted by the
//! submit endpoint.

use crate::error::{Error, Result};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happened upstream. Parsed case-insensitively; the HTTP verbs
/// POST, PUT and PATCH are accepted as legacy aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Method {
    Create,
    Update,
    Delete,
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CREATE" | "POST" => Ok(Method::Create),
            "UPDATE" | "PUT" | "PATCH" => Ok(Method::Update),
            "DELETE" => Ok(Method::Delete),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

impl TryFrom<String> for Method {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Method> for String {
    fn from(method: Method) -> Self {
        method.to_string()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Create => "CREATE",
            Method::Update => "UPDATE",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A fact about a write that already happened upstream.
///
/// Fields other than the three below (e.g. `item_id`, `item_type`) are kept in
/// `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(default)]
    pub entity_type: String,
    pub method: Method,
    pub entity_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ChangeEvent {
    pub fn new(entity_type: &str, method: Method, entity_id: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            method,
            entity_id: entity_id.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    /// Decodes and validates a raw feed payload.
    pub fn parse(payload: &str) -> Result<Self> {
        let event: ChangeEvent = serde_json::from_str(payload)?;
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<()> {
        if self.entity_id.trim().is_empty() {
            return Err(Error::InvalidInput("entity_id is required".to_string()));
        }
        if self.method != Method::Delete && self.entity_type.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "entity_type is required for {}",
                self.method
            )));
        }
        Ok(())
    }
}

/// Body of a `202 Accepted` from the submit endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status: String,
    pub subscribers: usize,
}
