mod ask;
mod health;
mod metrics;
mod stream;

pub use ask::ask_handler;
pub use health::health_handler;
pub use metrics::metrics_handler;
pub use stream::stream_handler;
