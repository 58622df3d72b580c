//! # sockvisor
//!
//! **Sockvisor** is a supervised, single-connection client for typed real-time
//! channels (JSON text frames over a WebSocket).
//!
//! It keeps one socket open to a server, reconnects with bounded exponential
//! backoff, queues commands while the socket is down, and dispatches inbound
//! events to subscribers by type without blocking the transport.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ── start / stop / send ──► Client ──(mailbox)──┐
//!                                                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (one actor task per client)                           │
//! │  - ConnectionState (validated transitions, watch, state hooks)    │
//! │  - attempt counter + BackoffPolicy / AttemptLimit                 │
//! │  - OutboundQueue (bounded FIFO while not Open)                    │
//! │  - at most one Session (Transport::connect)                       │
//! └──────┬─────────────────────────────┬──────────────────────────────┘
//!        │ frames                      │ lifecycle events
//!        ▼                             ▼
//! ┌──────────────────────┐   ┌───────────────────────────────────────┐
//! │ Router               │   │ Bus (broadcast, per-client sequence)  │
//! │ - decode / validate  │   └──────┬──────────────┬─────────────────┘
//! │ - dispatch by type   │          ▼              ▼
//! │ - encode commands    │     ObserverSet       on_error hooks
//! └──────┬───────────────┘    (per-observer
//!        ▼                     queues)
//!   subscriber callbacks
//! ```
//!
//! ### Lifecycle
//! ```text
//! Idle ──start()──► Connecting ──opened──► Open ──dropped──► ClosedRetrying
//!                      ▲                                       │    │
//!                      └──────── backoff.next(counter-1) ──────┘    │
//!                                                                   ▼
//!                                   counter ≥ max_attempts ──► ClosedTerminal
//! ```
//!
//! ## Features
//! | Area              | Description                                            | Key types / traits                          |
//! |-------------------|--------------------------------------------------------|---------------------------------------------|
//! | **Client**        | Start/stop, send, subscribe, hooks.                    | [`Client`], [`ClientConfig`], [`Endpoint`]  |
//! | **Policies**      | Reconnect delays and attempt ceiling.                  | [`BackoffPolicy`], [`JitterPolicy`], [`AttemptLimit`] |
//! | **Routing**       | Typed envelopes and per-type subscriptions.            | [`Envelope`], [`SubscriptionHandle`]        |
//! | **Transport**     | Pluggable session seam; WebSocket by default.          | [`Transport`], [`Session`], [`WsTransport`] |
//! | **Observability** | Lifecycle events, observers, `tracing` logs.           | [`Event`], [`Observer`], [`LogWriter`]      |
//! | **Errors**        | Typed failures and absorbed faults.                    | [`ClientError`], [`Fault`]                  |
//! | **Metrics**       | Reserved metric commands/events and a snapshot feed.   | [`protocol`], [`MetricsFeed`]               |
//!
//! ## Optional features
//! - `tls`: enables `wss://` endpoints (native TLS).
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use sockvisor::{Client, ClientConfig, Envelope, LogWriter, Observer, protocol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let observers: Vec<Arc<dyn Observer>> = vec![Arc::new(LogWriter)];
//!     let client = Client::builder(ClientConfig::new("ws://127.0.0.1:8000/ws/chat/"))
//!         .with_observers(observers)
//!         .build()?;
//!
//!     client.subscribe(protocol::METRICS_UPDATE, |env: &Envelope| {
//!         println!("metrics: {}", env.payload());
//!     })?;
//!     client.on_state_change(|from, to| println!("{from} -> {to}"));
//!
//!     client.start()?;
//!     client.send_envelope(protocol::chat_message("how many racks are free?")?)?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     client.stop()?;
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod metrics;
mod observers;
mod policies;
mod router;
mod transport;

pub mod protocol;

// ---- Public re-exports ----

pub use core::{Client, ClientBuilder, ClientConfig, ConnectionState, Endpoint, HookHandle};
pub use error::{ClientError, DecodeError, Fault, TransportError};
pub use events::{Event, EventKind};
pub use metrics::{FeedConfig, MetricsFeed, MetricsReading, SnapshotSource};
pub use observers::{LogWriter, Observer};
pub use policies::{AttemptLimit, BackoffPolicy, JitterPolicy};
pub use protocol::{MetricsCategory, MetricsSnapshot};
pub use router::{Envelope, PayloadLayout, SubscriptionHandle};
pub use transport::{Frame, Session, Transport, WsTransport};
