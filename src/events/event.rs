//! # Lifecycle events emitted by the supervisor, router and observers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Connection events**: state transitions, opens, failures, backoff
//! - **Outbound events**: queue flushes and evictions
//! - **Inbound events**: decode failures and subscriber panics
//! - **Observer events**: observer panics and overflow
//!
//! The [`Event`] struct carries optional metadata (transition, attempt, delay, topic,
//! reason, typed [`Fault`]) depending on the kind.
//!
//! ## Ordering guarantees
//! Every event published on a [`Bus`](crate::events::Bus) gets a sequence number that
//! increases monotonically **per bus** (i.e. per client instance).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use sockvisor::{ConnectionState, Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_attempt(3)
//!     .with_delay(Duration::from_secs(4));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay(), Some(Duration::from_secs(4)));
//!
//! let ev = Event::state_changed(ConnectionState::Idle, ConnectionState::Connecting);
//! assert_eq!(ev.to, Some(ConnectionState::Connecting));
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::core::ConnectionState;
use crate::error::Fault;

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Connection events ===
    /// The connection state changed.
    ///
    /// Sets:
    /// - `from`, `to`: the transition
    StateChanged,

    /// A session opened and the outbound queue was flushed.
    ///
    /// Consumers typically request a fresh snapshot here.
    Connected,

    /// A connection attempt failed (refused, errored or timed out).
    ///
    /// Sets:
    /// - `attempt`: consecutive failed attempts including this one
    /// - `fault`: [`Fault::Transport`]
    AttemptFailed,

    /// An open session closed without being asked to.
    ///
    /// Sets:
    /// - `fault`: [`Fault::Transport`]
    ConnectionLost,

    /// A reconnect timer was armed.
    ///
    /// Sets:
    /// - `attempt`: consecutive failed attempts so far
    /// - `delay_ms`: wait before the next attempt
    BackoffScheduled,

    /// The attempt limit was reached; the connection is terminal.
    ///
    /// Sets:
    /// - `attempt`: consecutive failed attempts
    /// - `fault`: [`Fault::PolicyExhausted`]
    PolicyExhausted,

    // === Outbound events ===
    /// Queued commands were written to a freshly opened session.
    ///
    /// Sets:
    /// - `count`: number of commands flushed
    QueueFlushed,

    /// A pending command was dropped from the outbound queue.
    ///
    /// Sets:
    /// - `topic`: command type
    /// - `reason`: `"overflow"` or `"expired"`
    CommandEvicted,

    // === Inbound events ===
    /// An inbound frame could not be decoded.
    ///
    /// Sets:
    /// - `fault`: [`Fault::Decode`]
    DecodeFailed,

    /// A subscriber callback panicked during dispatch.
    ///
    /// Sets:
    /// - `topic`: event type being dispatched
    /// - `fault`: [`Fault::Subscriber`]
    SubscriberPanicked,

    // === Observer events ===
    /// An observer panicked while handling an event.
    ///
    /// Sets:
    /// - `topic`: observer name
    /// - `fault`: [`Fault::Observer`]
    ObserverPanicked,

    /// An observer dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `topic`: observer name
    /// - `reason`: `"full"` or `"closed"`
    ObserverOverflow,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: per-bus monotonic sequence (assigned on publish)
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Per-bus monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Previous state (for `StateChanged`).
    pub from: Option<ConnectionState>,
    /// New state (for `StateChanged`).
    pub to: Option<ConnectionState>,
    /// Consecutive failed attempts.
    pub attempt: Option<u32>,
    /// Backoff delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Number of items affected.
    pub count: Option<u32>,
    /// Message type or observer name, if applicable.
    pub topic: Option<Arc<str>>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
    /// Typed fault, for events the error hook receives.
    pub fault: Option<Fault>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: 0,
            at: SystemTime::now(),
            kind,
            from: None,
            to: None,
            attempt: None,
            delay_ms: None,
            count: None,
            topic: None,
            reason: None,
            fault: None,
        }
    }

    /// Creates a state transition event.
    #[inline]
    pub fn state_changed(from: ConnectionState, to: ConnectionState) -> Self {
        let mut ev = Event::new(EventKind::StateChanged);
        ev.from = Some(from);
        ev.to = Some(to);
        ev
    }

    /// Attaches a consecutive failed attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an item count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n.min(u32::MAX as usize) as u32);
        self
    }

    /// Attaches a message type or observer name.
    #[inline]
    pub fn with_topic(mut self, topic: impl Into<Arc<str>>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a typed fault; its display string becomes the reason.
    #[inline]
    pub fn with_fault(mut self, fault: impl Into<Fault>) -> Self {
        let fault = fault.into();
        self.reason = Some(fault.to_string().into());
        self.fault = Some(fault);
        self
    }

    /// Creates an observer overflow event.
    #[inline]
    pub fn observer_overflow(observer: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::ObserverOverflow)
            .with_topic(observer)
            .with_reason(reason)
    }

    /// Creates an observer panic event.
    #[inline]
    pub fn observer_panicked(observer: &'static str, info: String) -> Self {
        Event::new(EventKind::ObserverPanicked)
            .with_topic(observer)
            .with_fault(Fault::Observer {
                observer: observer.into(),
                info: info.into(),
            })
    }

    /// Returns the backoff delay, if set.
    #[inline]
    pub fn delay(&self) -> Option<Duration> {
        self.delay_ms.map(|ms| Duration::from_millis(u64::from(ms)))
    }

    #[inline]
    pub fn is_observer_overflow(&self) -> bool {
        matches!(self.kind, EventKind::ObserverOverflow)
    }

    #[inline]
    pub fn is_fault(&self) -> bool {
        self.fault.is_some()
    }
}
