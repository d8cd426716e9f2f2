use super::types::SubmitResponse;
use crate::search::handlers::{ApiError, error_response};
use crate::service::SearchService;

use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

/// Accepts a change event and puts it on the feed. The body is validated but
/// forwarded as received; indexing happens later on the worker.
pub async fn handle_emit(
    Extension(service): Extension<Arc<SearchService>>,
    body: String,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let subscribers = service
        .submit_change_event(&body)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            status: "accepted".to_string(),
            subscribers,
        }),
    ))
}
