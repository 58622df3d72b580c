//! # Lifecycle observer trait.
//!
//! Provides [`Observer`], an extension point for plugging custom handlers
//! (metrics export, audit, alerting) into the client's lifecycle stream.
//!
//! Each observer gets:
//! - **Dedicated worker task** (runs independently of the supervisor)
//! - **Per-observer bounded queue** (capacity via [`Observer::queue_capacity`])
//! - **Panic isolation** (panics are caught and reported as `EventKind::ObserverPanicked`)
//!
//! ## Architecture
//! ```text
//! ObserverSet ──► [bounded queue] ──► worker task ──► observer.on_event()
//!                                  └─► panic caught → EventKind::ObserverPanicked
//! ```
//!
//! ## Rules
//! - A slow observer only affects its own queue; the supervisor never waits for it.
//! - Queue overflow drops the event **for this observer only** and publishes
//!   `EventKind::ObserverOverflow`.
//! - Events are processed sequentially (FIFO) per observer.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use sockvisor::{Event, EventKind, Observer};
//!
//! struct Reconnects;
//!
//! #[async_trait]
//! impl Observer for Reconnects {
//!     async fn on_event(&self, ev: &Event) {
//!         if matches!(ev.kind, EventKind::BackoffScheduled) {
//!             // bump a counter, page someone, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "reconnects" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Lifecycle event observer.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Observer: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, never from the supervisor.
    async fn on_event(&self, event: &Event);

    /// Returns the observer name used in logs and overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
