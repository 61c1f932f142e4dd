use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;

use crate::client_ip::resolve_client_id;
use crate::error::GatewayError;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_LATENCY, REQUEST_TOTAL};
use crate::models::{AskRequest, validate};
use crate::state::AppState;

// Non-streaming ask: fixed-window admission, then a plain proxied
// request/response round trip to the inference service.
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AskRequest>,
) -> Result<Response, GatewayError> {
    REQUEST_TOTAL.inc();

    let upstream_req = validate(&payload, false).map_err(GatewayError::Validation)?;
    let client_id = resolve_client_id(&headers);

    let preset = state.presets.query;
    let slot = state
        .rate_limiter
        .admit(&client_id, preset.limit, preset.window_ms);
    if !slot.allowed {
        RATE_LIMITED_TOTAL.inc();
        return Err(GatewayError::RateLimited(slot));
    }

    let start_time = Instant::now();

    let upstream = state
        .client
        .post(format!("{}/api/ask", state.upstream_url))
        .json(&upstream_req)
        .send()
        .await?;
    if !upstream.status().is_success() {
        return Err(GatewayError::UpstreamStatus(upstream.status().as_u16()));
    }
    let body: serde_json::Value = upstream.json().await?;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let mut response = Json(body).into_response();
    slot.apply_headers(response.headers_mut());
    Ok(response)
}
