//! Connection core: state machine, supervisor actor and the public handle.
//!
//! - [`state`]: [`ConnectionState`] and its transition table;
//! - [`config`]: [`ClientConfig`] and [`Endpoint`];
//! - [`outbound`]: bounded FIFO for commands issued while not `Open`;
//! - `supervisor`: the actor that owns the session, queue and attempt counter;
//! - [`client`]: [`Client`] and its builder;
//! - [`hooks`]: `on_state_change` / `on_error` listeners.
//!
//! Only the supervisor mutates connection state; everything else talks to it
//! through the client mailbox or observes it through the bus and watch channel.

pub mod client;
pub mod config;
pub mod hooks;
pub mod outbound;
pub mod state;
mod supervisor;

pub use client::{Client, ClientBuilder};
pub use config::{ClientConfig, Endpoint};
pub use hooks::HookHandle;
pub(crate) use outbound::OutboundQueue;
pub use state::ConnectionState;

pub(crate) use supervisor::next_tick;
