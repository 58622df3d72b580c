//! # Lifecycle observers.
//!
//! This module provides the [`Observer`] trait, the [`ObserverSet`] fan-out and the
//! built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//!   Supervisor ── publish(Event) ──► Bus ──► observer listener ──► ObserverSet::emit(&Event)
//!                                                              ┌─────────┼─────────┐
//!                                                              ▼         ▼         ▼
//!                                                          LogWriter  Metrics   Custom
//! ```
//!
//! Observers see *lifecycle* events (state changes, retries, faults). Inbound
//! application messages go through [`Client::subscribe`](crate::Client::subscribe).

mod log;
mod observer;
mod set;

pub use log::LogWriter;
pub use observer::Observer;
pub use set::ObserverSet;
