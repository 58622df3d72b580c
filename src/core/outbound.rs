//! # Outbound queue.
//!
//! Bounded FIFO of commands issued while the connection is not `Open`.
//! Owned and drained only by the supervisor.
//!
//! ```text
//!  push_back ──► [oldest … newest] ──► pop_front ──► Session::send
//!                    │                                  │ failed
//!      overflow: drop oldest                 push_front (retry next Open)
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::router::Envelope;

/// A queued command and the time it was queued.
#[derive(Debug, Clone)]
pub struct PendingOutbound {
    pub envelope: Envelope,
    pub enqueued_at: Instant,
}

/// Bounded FIFO that evicts its oldest item on overflow.
#[derive(Debug)]
pub struct OutboundQueue {
    items: VecDeque<PendingOutbound>,
    capacity: usize,
    ttl: Option<Duration>,
}

impl OutboundQueue {
    /// Creates a queue holding at most `capacity` items (clamped to at least 1).
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity.min(64)),
            capacity,
            ttl,
        }
    }

    /// Appends at the tail. Returns the evicted oldest item, if the queue was full.
    pub fn push_back(&mut self, envelope: Envelope) -> Option<Envelope> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front().map(|p| p.envelope)
        } else {
            None
        };
        self.items.push_back(PendingOutbound {
            envelope,
            enqueued_at: Instant::now(),
        });
        evicted
    }

    /// Puts an item back at the head (after a failed send).
    pub fn push_front(&mut self, item: PendingOutbound) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
    }

    pub fn pop_front(&mut self) -> Option<PendingOutbound> {
        self.items.pop_front()
    }

    /// Removes items older than the TTL and returns them, oldest first.
    pub fn take_expired(&mut self, now: Instant) -> Vec<Envelope> {
        let Some(ttl) = self.ttl else {
            return Vec::new();
        };
        let mut expired = Vec::new();
        self.items.retain(|p| {
            if now.saturating_duration_since(p.enqueued_at) > ttl {
                expired.push(p.envelope.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(n: u32) -> Envelope {
        Envelope::new("cmd", json!(n)).unwrap()
    }

    fn drain(q: &mut OutboundQueue) -> Vec<serde_json::Value> {
        std::iter::from_fn(|| q.pop_front())
            .map(|p| p.envelope.payload().clone())
            .collect()
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut q = OutboundQueue::new(2, None);
        assert!(q.push_back(env(1)).is_none());
        assert!(q.push_back(env(2)).is_none());
        let evicted = q.push_back(env(3)).expect("evicted");
        assert_eq!(evicted.payload(), &json!(1));
        assert_eq!(q.len(), 2);
        assert_eq!(drain(&mut q), vec![json!(2), json!(3)]);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut q = OutboundQueue::new(0, None);
        assert_eq!(q.capacity(), 1);
        q.push_back(env(1));
        q.push_back(env(2));
        assert_eq!(drain(&mut q), vec![json!(2)]);
    }

    #[test]
    fn failed_item_goes_back_to_head() {
        let mut q = OutboundQueue::new(4, None);
        q.push_back(env(1));
        q.push_back(env(2));
        let head = q.pop_front().unwrap();
        q.push_front(head);
        assert_eq!(drain(&mut q), vec![json!(1), json!(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_old_items() {
        let mut q = OutboundQueue::new(4, Some(Duration::from_secs(5)));
        q.push_back(env(1));
        tokio::time::advance(Duration::from_secs(4)).await;
        q.push_back(env(2));
        tokio::time::advance(Duration::from_secs(2)).await;

        let expired = q.take_expired(Instant::now());
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].payload(), &json!(1));
        assert_eq!(drain(&mut q), vec![json!(2)]);
    }
}
