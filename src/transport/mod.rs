//! Transport sessions.
//!
//! - [`Transport`] / [`Session`] the seam the supervisor drives
//! - [`Frame`] text or binary payload
//! - [`WsTransport`] WebSocket implementation (`tokio-tungstenite`)

mod session;
mod websocket;

pub use session::{Frame, Session, Transport};
pub use websocket::WsTransport;
