use axum::{
    Router,
    routing::{get, post},
};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod client_ip;
mod config;
mod error;
mod handlers;
mod limiter;
mod metrics;
mod models;
mod relay;
mod state;

use config::Args;
use handlers::{ask_handler, health_handler, metrics_handler, stream_handler};
use limiter::spawn_sweeper;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = Arc::new(AppState::from_args(&args));

    // background eviction of expired windows and empty connection sets
    spawn_sweeper(
        state.rate_limiter.clone(),
        state.gate.clone(),
        Duration::from_secs(args.sweep_interval),
    );

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/ask", post(ask_handler))
        .route("/api/ask/stream", post(stream_handler))
        .with_state(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();

    info!(port = args.port, upstream = %args.upstream_url, "gateway running");
    info!(
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        max_streams = args.max_streams,
        idle_timeout_secs = args.idle_timeout,
        "limits configured"
    );
    axum::serve(listener, app).await.unwrap();
}
