use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use uuid::Uuid;

use crate::limiter::SlotResult;

// Everything a handler can fail with. Quota rejections carry the
// SlotResult so the 429 can emit the X-RateLimit-* headers; upstream
// and internal failures are sanitized to a correlation id before they
// reach the wire, with the raw detail logged server-side.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("too many requests")]
    RateLimited(SlotResult),

    #[error("too many concurrent streams")]
    ConnectionLimited(SlotResult),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": message })),
            )
                .into_response(),

            GatewayError::RateLimited(slot) | GatewayError::ConnectionLimited(slot) => {
                let mut response = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "Too many requests, please try again later" })),
                )
                    .into_response();
                slot.apply_headers(response.headers_mut());
                response
            }

            GatewayError::Upstream(source) => {
                sanitized(StatusCode::BAD_GATEWAY, "upstream request failed", &source)
            }

            GatewayError::UpstreamStatus(status) => sanitized(
                StatusCode::BAD_GATEWAY,
                "upstream returned an error status",
                &status,
            ),

            GatewayError::Internal(detail) => {
                sanitized(StatusCode::INTERNAL_SERVER_ERROR, "internal error", &detail)
            }
        }
    }
}

// Log the real failure with a correlation id, return only the id and a
// generic message to the client.
fn sanitized(status: StatusCode, context: &str, detail: &dyn std::fmt::Display) -> Response {
    let correlation_id = Uuid::new_v4();
    error!(%correlation_id, detail = %detail, "{context}");
    (
        status,
        Json(json!({
            "error": "The service is temporarily unavailable, please try again later",
            "correlation_id": correlation_id.to_string(),
        })),
    )
        .into_response()
}
