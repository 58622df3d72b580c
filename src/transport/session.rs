//! # Transport seam: one socket at a time.
//!
//! [`Transport`] opens sessions; [`Session`] is one live bidirectional channel of
//! text or binary [`Frame`]s. The supervisor owns at most one session at a time and
//! drops it before opening the next.
//!
//! ```text
//!   Transport::connect(url) ──► Box<dyn Session>
//!                                  ├─ send(Frame)
//!                                  ├─ recv() ──► Frame | TransportError
//!                                  └─ close()
//! ```
//!
//! The production implementation is [`WsTransport`](super::WsTransport). Tests plug
//! in scripted transports through the same traits.

use async_trait::async_trait;
use url::Url;

use crate::error::TransportError;

/// One inbound or outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text frame.
    Text(String),
    /// Raw binary frame.
    Binary(Vec<u8>),
}

impl Frame {
    /// Length of the frame body in bytes.
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(s) => s.len(),
            Frame::Binary(b) => b.len(),
        }
    }

    /// True if the body is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Opens sessions to an endpoint.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Opens a new session. Resolves when the session is usable or the attempt failed.
    ///
    /// Dropping the returned future abandons the attempt.
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn Session>, TransportError>;
}

/// A live session.
///
/// `recv()` must be cancel-safe: the supervisor polls it inside `select!`.
#[async_trait]
pub trait Session: Send {
    /// Writes one frame.
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError>;

    /// Waits for the next data frame.
    ///
    /// Control frames are handled internally. End of stream is reported as
    /// [`TransportError::Closed`].
    async fn recv(&mut self) -> Result<Frame, TransportError>;

    /// Closes the session gracefully. Errors are swallowed; the session is
    /// discarded afterwards either way.
    async fn close(&mut self);
}
