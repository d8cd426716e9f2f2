use super::limiter::RateLimiter;
use crate::search::types::ErrorResponse;

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use std::net::SocketAddr;
use std::sync::Arc;

const FORWARDED_FOR: &str = "x-forwarded-for";
const UNKNOWN_IDENTITY: &str = "unknown";

/// First entry of `X-Forwarded-For` when present, else the peer IP.
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty());

    match (forwarded, peer) {
        (Some(first), _) => first.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => UNKNOWN_IDENTITY.to_string(),
    }
}

/// Rejects over-limit callers with 429 before the handler runs.
pub async fn rate_limit(
    Extension(limiter): Extension<Arc<RateLimiter>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    request: Request,
    next: Next,
) -> Response {
    let identity = client_identity(request.headers(), connect_info.map(|ConnectInfo(addr)| addr));

    if !limiter.allow(&identity) {
        tracing::warn!("Rate limit exceeded for {}", identity);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorResponse {
                error: "Too many requests".to_string(),
            }),
        )
            .into_response();
    }

    next.run(request).await
}
