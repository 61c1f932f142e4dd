use clap::Parser;

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "inference-gateway")]
#[command(about = "Rate-limiting streaming proxy for a slow inference backend")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    // Inference service base url
    #[arg(short, long, default_value = "http://localhost:8000")]
    pub upstream_url: String,

    // Rate limit max requests per window (query endpoints); the
    // limiter contract needs at least one
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_window: u64,

    // Concurrent streams allowed per client
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_streams: u32,

    // Seconds without an upstream chunk before a stream is dropped
    #[arg(long, default_value_t = 120)]
    pub idle_timeout: u64,

    // Seconds between store sweeps
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,
}

// One endpoint class worth of limits
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPreset {
    pub limit: u32,
    pub window_ms: i64,
    pub max_connections: u32,
}

// Per endpoint-class presets. Auth and media keep fixed defaults; the
// query and stream classes take their numbers from the CLI.
#[derive(Debug, Clone, Copy)]
pub struct Presets {
    pub auth: RateLimitPreset,
    pub query: RateLimitPreset,
    pub stream: RateLimitPreset,
    pub media: RateLimitPreset,
}

impl Presets {
    pub fn from_args(args: &Args) -> Self {
        let window_ms = (args.rate_window as i64) * 1000;
        Self {
            auth: RateLimitPreset {
                limit: 20,
                window_ms: 60_000,
                max_connections: 1,
            },
            query: RateLimitPreset {
                limit: args.rate_limit,
                window_ms,
                max_connections: args.max_streams,
            },
            stream: RateLimitPreset {
                limit: args.rate_limit,
                window_ms,
                max_connections: args.max_streams,
            },
            media: RateLimitPreset {
                limit: 60,
                window_ms: 60_000,
                max_connections: 2,
            },
        }
    }
}
