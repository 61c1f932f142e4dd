use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::limiter::SlotGuard;
use crate::metrics::{ACTIVE_STREAMS, RELAYED_BYTES};

// Keeps the active-streams gauge honest the same way SlotGuard keeps
// the slot count honest: decremented on drop, so a panic in the pump
// loop cannot leave it inflated.
struct GaugeGuard(&'static prometheus::Gauge);

impl GaugeGuard {
    fn track(gauge: &'static prometheus::Gauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

// Pumps an upstream byte stream into a channel the HTTP response body
// reads from, and owns the connection slot for the duration.
//
// The pump runs as a spawned task so the handler can hand the response
// body to the client immediately. Terminal paths:
//   - upstream ends cleanly: channel closed, slot released
//   - upstream errors: sanitized error forwarded, slot released
//   - client disconnects: channel send fails, upstream dropped, slot released
//   - no chunk within idle_timeout: treated as an upstream failure
// The SlotGuard releases on drop, so even a panic in the loop cannot
// leak the slot. Chunks are forwarded exactly as received, in order.
pub fn spawn_relay<S, E>(
    upstream: S,
    guard: SlotGuard,
    idle_timeout: Duration,
) -> ReceiverStream<Result<Bytes, io::Error>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Result<Bytes, io::Error>>(32);

    tokio::spawn(async move {
        let _active = GaugeGuard::track(&ACTIVE_STREAMS);
        let identifier = guard.identifier().to_owned();
        tokio::pin!(upstream);

        loop {
            match tokio::time::timeout(idle_timeout, upstream.next()).await {
                Ok(None) => {
                    debug!(%identifier, "upstream stream completed");
                    break;
                }
                Ok(Some(Ok(chunk))) => {
                    RELAYED_BYTES.inc_by(chunk.len() as f64);
                    if tx.send(Ok(chunk)).await.is_err() {
                        // client went away; dropping the upstream reader
                        // cancels the inference request
                        warn!(%identifier, "downstream disconnected, cancelling upstream");
                        break;
                    }
                }
                Ok(Some(Err(e))) => {
                    let correlation_id = Uuid::new_v4();
                    error!(%identifier, %correlation_id, error = %e, "upstream stream failed");
                    let _ = tx
                        .send(Err(io::Error::other(format!(
                            "stream failed (id {correlation_id})"
                        ))))
                        .await;
                    break;
                }
                Err(_) => {
                    let correlation_id = Uuid::new_v4();
                    error!(
                        %identifier,
                        %correlation_id,
                        idle_secs = idle_timeout.as_secs(),
                        "upstream stream went idle, dropping it"
                    );
                    let _ = tx
                        .send(Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            format!("stream timed out (id {correlation_id})"),
                        )))
                        .await;
                    break;
                }
            }
        }

        // close the downstream sink before giving the slot back
        drop(tx);
        guard.release();
    });

    ReceiverStream::new(rx)
}
