use axum::http::{HeaderMap, HeaderValue};

// Outcome of an admission check - returned by both the window limiter
// and the connection gate, never mutated after construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,            // epoch millis
    pub retry_after: Option<u64>, // seconds
}

impl SlotResult {
    pub fn granted(limit: u32, remaining: u32, reset_at: i64) -> Self {
        Self {
            allowed: true,
            limit,
            remaining,
            reset_at,
            retry_after: None,
        }
    }

    pub fn denied(limit: u32, reset_at: i64, retry_after: u64) -> Self {
        Self {
            allowed: false,
            limit,
            remaining: 0,
            reset_at,
            retry_after: Some(retry_after),
        }
    }

    // Standard X-RateLimit-* response headers; reset is reported in epoch seconds
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert("x-ratelimit-reset", HeaderValue::from(self.reset_at / 1000));
        if let Some(retry) = self.retry_after {
            headers.insert("retry-after", HeaderValue::from(retry));
        }
    }
}
