//! Search Module
//!
//! The read side of the system: turning a query string into ranked, hydrated
//! entities of one type.
//!
//! ## Responsibilities
//! - **Tokenization**: one tokenizer shared by indexing and querying, so stored
//!   and queried tokens always line up.
//! - **Ranking**: AND intersection for plain queries, weighted OR with a
//!   hashtag boost when the query carries a `#`.
//! - **Retrieval**: hydrating ranked ids from the snapshot store in rank order.
//! - **API**: the search, autocomplete and health endpoints.
//!
//! ## Submodules
//! - **`engine`**: `Retriever` plus the pure ranking functions.
//! - **`handlers`**: Axum handlers and error-to-status mapping.
//! - **`tokenizer`**: normalization, stop words, hashtag detection.
//! - **`types`**: request and response DTOs.

pub mod engine;
pub mod handlers;
pub mod tokenizer;
pub mod types;
