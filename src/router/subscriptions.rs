//! # Subscription registry.
//!
//! Maps an event type to its callbacks in registration order.
//!
//! ```text
//! "metrics_update" ─► [Some(#1), None, Some(#4), Some(#7)]   (None = tombstone)
//! "pong"           ─► [Some(#2)]
//! index: #1 → ("metrics_update", 0), #4 → ("metrics_update", 2), …
//! ```
//!
//! Unsubscribe writes a tombstone through the index (O(1)); a topic is compacted
//! once tombstones outnumber live slots, which keeps the cost amortized O(1).
//! Readers take a [`snapshot`](Subscriptions::snapshot) so a dispatch pass is not
//! affected by registry changes made while it runs.

use std::collections::HashMap;
use std::sync::Arc;

use crate::router::Envelope;

/// Subscriber callback.
pub type Handler = Arc<dyn Fn(&Envelope) + Send + Sync + 'static>;

/// Opaque token returned by `subscribe`, consumed by `unsubscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

impl SubscriptionHandle {
    /// Numeric id (unique per client).
    pub fn id(self) -> u64 {
        self.0
    }
}

struct Slot {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct Topic {
    slots: Vec<Option<Slot>>,
    live: usize,
}

impl Topic {
    fn tombstones(&self) -> usize {
        self.slots.len() - self.live
    }
}

/// Registry of callbacks per event type.
#[derive(Default)]
pub struct Subscriptions {
    topics: HashMap<String, Topic>,
    index: HashMap<u64, (String, usize)>,
    next_id: u64,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a callback for `kind`.
    pub fn insert(&mut self, kind: &str, handler: Handler) -> SubscriptionHandle {
        self.next_id += 1;
        let id = self.next_id;

        let topic = self.topics.entry(kind.to_owned()).or_default();
        topic.slots.push(Some(Slot { id, handler }));
        topic.live += 1;
        self.index
            .insert(id, (kind.to_owned(), topic.slots.len() - 1));

        SubscriptionHandle(id)
    }

    /// Removes a callback. Returns `false` if the handle was already removed.
    pub fn remove(&mut self, handle: SubscriptionHandle) -> bool {
        let Some((kind, pos)) = self.index.remove(&handle.0) else {
            return false;
        };
        let Some(topic) = self.topics.get_mut(&kind) else {
            return false;
        };
        if topic.slots.get_mut(pos).and_then(Option::take).is_none() {
            return false;
        }
        topic.live -= 1;

        if topic.live == 0 {
            self.topics.remove(&kind);
        } else if topic.tombstones() > topic.live {
            Self::compact(topic, &kind, &mut self.index);
        }
        true
    }

    /// Live callbacks for `kind`, in registration order.
    pub fn snapshot(&self, kind: &str) -> Vec<Handler> {
        self.topics
            .get(kind)
            .map(|t| {
                t.slots
                    .iter()
                    .flatten()
                    .map(|s| Arc::clone(&s.handler))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of live callbacks for `kind`.
    pub fn count(&self, kind: &str) -> usize {
        self.topics.get(kind).map_or(0, |t| t.live)
    }

    /// Total live callbacks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn compact(topic: &mut Topic, kind: &str, index: &mut HashMap<u64, (String, usize)>) {
        topic.slots.retain(Option::is_some);
        for (pos, slot) in topic.slots.iter().enumerate() {
            if let Some(slot) = slot {
                index.insert(slot.id, (kind.to_owned(), pos));
            }
        }
    }
}
