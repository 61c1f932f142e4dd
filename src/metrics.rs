use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "gateway_rate_limited_total",
        "Requests rejected by the rate limiter or connection gate"
    )
    .unwrap();
    pub static ref ACTIVE_STREAMS: Gauge = register_gauge!(
        "gateway_active_streams",
        "Streams currently being relayed from the upstream"
    )
    .unwrap();
    pub static ref RELAYED_BYTES: Counter = register_counter!(
        "gateway_relayed_bytes_total",
        "Bytes relayed from upstream to clients"
    )
    .unwrap();
    pub static ref TRACKED_WINDOWS: Gauge = register_gauge!(
        "gateway_window_records",
        "Identifiers with a live rate-limit window"
    )
    .unwrap();
    pub static ref TRACKED_CONNECTION_SETS: Gauge = register_gauge!(
        "gateway_connection_sets",
        "Identifiers with a tracked connection set"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "gateway_request_latency_seconds",
        "Non-streaming request latency in seconds"
    )
    .unwrap();
}
