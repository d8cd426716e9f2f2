use super::types::{
    AutocompleteParams, AutocompleteResponse, ErrorResponse, SearchParams, SearchResponse,
    SearchResultItem,
};
use crate::error::Error;
use crate::service::SearchService;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::{Extension, Json};
use std::sync::Arc;

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub async fn handle_search(
    Path(entity_type): Path<String>,
    Query(params): Query<SearchParams>,
    Extension(service): Extension<Arc<SearchService>>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = params.text().to_string();

    let hits = service
        .search(&entity_type, &query, params.limit)
        .await
        .map_err(error_response)?;

    let results: Vec<SearchResultItem> = hits.into_iter().map(SearchResultItem::from).collect();
    Ok(Json(SearchResponse {
        entity_type,
        query,
        count: results.len(),
        results,
    }))
}

pub async fn handle_autocomplete(
    Query(params): Query<AutocompleteParams>,
    Extension(service): Extension<Arc<SearchService>>,
) -> Result<Json<AutocompleteResponse>, ApiError> {
    let suggestions = service
        .autocomplete(&params.prefix, params.limit)
        .await
        .map_err(error_response)?;

    Ok(Json(AutocompleteResponse {
        prefix: params.prefix,
        suggestions,
    }))
}

pub async fn handle_health() -> &'static str {
    "ok"
}

/// Maps a service error onto an HTTP status with a JSON body.
pub fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidInput(_) | Error::UnsupportedType(_) | Error::MalformedEvent(_) => {
            StatusCode::BAD_REQUEST
        }
        Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::debug!("Rejected request: {}", err);
    }

    let message = match &err {
        Error::UnsupportedType(entity_type) => format!("Unsupported entity type: {}", entity_type),
        _ => err.to_string(),
    };
    (status, Json(ErrorResponse { error: message }))
}
