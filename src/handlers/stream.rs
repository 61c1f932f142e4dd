use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::Response;
use std::sync::Arc;
use uuid::Uuid;

use crate::client_ip::resolve_client_id;
use crate::error::GatewayError;
use crate::metrics::{RATE_LIMITED_TOTAL, REQUEST_TOTAL};
use crate::models::{AskRequest, validate};
use crate::relay::spawn_relay;
use crate::state::AppState;

// Streaming ask: claim a connection slot, open the upstream stream and
// relay it back as SSE. The SlotGuard travels into the relay task on
// success; every early return before that point drops it, which
// releases the slot.
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<AskRequest>,
) -> Result<Response, GatewayError> {
    REQUEST_TOTAL.inc();

    let upstream_req = validate(&payload, true).map_err(GatewayError::Validation)?;
    let client_id = resolve_client_id(&headers);

    let preset = state.presets.stream;
    let connection_id = Uuid::new_v4().to_string();
    let slot = state
        .gate
        .acquire(&client_id, &connection_id, preset.max_connections);
    if !slot.allowed {
        RATE_LIMITED_TOTAL.inc();
        return Err(GatewayError::ConnectionLimited(slot));
    }
    let guard = crate::limiter::SlotGuard::new(state.gate.clone(), client_id, connection_id);

    let upstream = state
        .client
        .post(format!("{}/api/ask", state.upstream_url))
        .json(&upstream_req)
        .send()
        .await?;
    if !upstream.status().is_success() {
        return Err(GatewayError::UpstreamStatus(upstream.status().as_u16()));
    }

    let relayed = spawn_relay(upstream.bytes_stream(), guard, state.idle_timeout);

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(relayed))
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    slot.apply_headers(response.headers_mut());
    Ok(response)
}
