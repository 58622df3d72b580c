//! Lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast` with a per-bus sequence
//!
//! ## Quick reference
//! - **Publishers**: `core::supervisor` (state, attempts, backoff, queue),
//!   `router` (decode failures, subscriber panics), `ObserverSet` workers.
//! - **Consumers**: the observer listener, client hooks, `Client::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
