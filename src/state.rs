use std::sync::Arc;
use std::time::Duration;

use crate::config::{Args, Presets};
use crate::limiter::{ConnectionGate, RateLimiter};

// retry-after advertised on connection-slot rejections; slots have no
// natural reset clock the way windows do
const SLOT_RETRY_CEILING_SECS: u64 = 60;

// app's shared state
pub struct AppState {
    pub client: reqwest::Client,
    pub upstream_url: String,
    pub rate_limiter: Arc<RateLimiter>,
    pub gate: Arc<ConnectionGate>,
    pub presets: Presets,
    pub idle_timeout: Duration,
}

impl AppState {
    pub fn from_args(args: &Args) -> Self {
        Self {
            client: reqwest::Client::new(),
            upstream_url: args.upstream_url.trim_end_matches('/').to_owned(),
            rate_limiter: Arc::new(RateLimiter::new()),
            gate: Arc::new(ConnectionGate::new(SLOT_RETRY_CEILING_SECS)),
            presets: Presets::from_args(args),
            idle_timeout: Duration::from_secs(args.idle_timeout),
        }
    }
}
