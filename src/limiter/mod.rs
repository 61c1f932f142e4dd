// Rate limiting for the gateway: a fixed-window request counter, a
// concurrent-stream gate, and the background sweeper that keeps both
// stores bounded.

mod connections;
mod slot;
mod sweeper;
mod window;

pub use connections::{ConnectionGate, SlotGuard};
pub use slot::SlotResult;
pub use sweeper::spawn_sweeper;
pub use window::RateLimiter;
