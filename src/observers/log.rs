//! # Logging observer.
//!
//! [`LogWriter`] renders lifecycle events through `tracing`, one line per event:
//!
//! ```text
//! INFO  state from=idle to=connecting
//! WARN  attempt failed attempt=1 err="connect to ws://… failed: refused"
//! INFO  backoff scheduled attempt=1 delay_ms=5000
//! ERROR reconnect policy exhausted attempt=10
//! ```
//!
//! Install a `tracing` subscriber (e.g. `tracing-subscriber`) to see the output.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};

use super::Observer;

/// Observer that logs lifecycle events via `tracing`.
pub struct LogWriter;

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("");
        let topic = e.topic.as_deref().unwrap_or("");

        match e.kind {
            EventKind::StateChanged => {
                if let (Some(from), Some(to)) = (e.from, e.to) {
                    info!(seq = e.seq, %from, %to, "state");
                }
            }
            EventKind::Connected => info!(seq = e.seq, "connected"),
            EventKind::AttemptFailed => {
                warn!(seq = e.seq, attempt = ?e.attempt, err = reason, "attempt failed");
            }
            EventKind::ConnectionLost => warn!(seq = e.seq, err = reason, "connection lost"),
            EventKind::BackoffScheduled => {
                info!(seq = e.seq, attempt = ?e.attempt, delay_ms = ?e.delay_ms, "backoff scheduled");
            }
            EventKind::PolicyExhausted => {
                error!(seq = e.seq, attempt = ?e.attempt, "reconnect policy exhausted");
            }
            EventKind::QueueFlushed => debug!(seq = e.seq, count = ?e.count, "queue flushed"),
            EventKind::CommandEvicted => {
                warn!(seq = e.seq, kind = topic, reason, "command evicted");
            }
            EventKind::DecodeFailed => warn!(seq = e.seq, err = reason, "decode failed"),
            EventKind::SubscriberPanicked => {
                error!(seq = e.seq, kind = topic, err = reason, "subscriber panicked");
            }
            EventKind::ObserverPanicked => {
                error!(seq = e.seq, observer = topic, err = reason, "observer panicked");
            }
            EventKind::ObserverOverflow => {
                warn!(seq = e.seq, observer = topic, reason, "observer dropped event");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
