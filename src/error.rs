//! Error types used by the client, the transport and the router.
//!
//! This module defines the typed failure taxonomy:
//!
//! - [`TransportError`] — socket-level failures (connect refused, timeout, abrupt close).
//!   Always retried per the backoff policy; never returned from the public API.
//! - [`DecodeError`] — malformed inbound frames. Reported and discarded; only
//!   [`DecodeError::is_fatal`] errors tear the session down.
//! - [`ClientError`] — caller misuse, rejected synchronously by the public API.
//! - [`Fault`] — everything the error hook can observe.
//!
//! All of them provide `as_label()` for logs/metrics.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by the transport layer.
///
/// These represent failures of one transport session. The supervisor absorbs them
/// and schedules a reconnect.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The socket could not be established.
    #[error("connect to {endpoint} failed: {reason}")]
    Connect {
        /// Endpoint the attempt targeted.
        endpoint: String,
        /// Underlying failure message.
        reason: String,
    },

    /// The connection attempt exceeded its timeout.
    #[error("connect timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// The peer closed the session.
    #[error("session closed by peer (code={code:?}): {reason}")]
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason (may be empty).
        reason: String,
    },

    /// Reading from or writing to an open session failed.
    #[error("session i/o failed: {reason}")]
    Io {
        /// Underlying failure message.
        reason: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use sockvisor::TransportError;
    ///
    /// let err = TransportError::Timeout { timeout: Duration::from_secs(1) };
    /// assert_eq!(err.as_label(), "transport_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Connect { .. } => "transport_connect",
            TransportError::Timeout { .. } => "transport_timeout",
            TransportError::Closed { .. } => "transport_closed",
            TransportError::Io { .. } => "transport_io",
        }
    }

    /// Shorthand for [`TransportError::Io`].
    pub fn io(reason: impl Into<String>) -> Self {
        TransportError::Io {
            reason: reason.into(),
        }
    }
}

/// # Errors produced while decoding an inbound frame.
///
/// A single bad frame is not fatal: the supervisor reports it and keeps the session.
/// Errors for which [`is_fatal`](Self::is_fatal) returns `true` indicate a peer that
/// does not speak the protocol at all; the session is closed and re-established.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame is not valid JSON.
    #[error("malformed frame: {reason}")]
    Malformed {
        /// Parser message.
        reason: String,
    },

    /// The frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The frame has no string `type` field (or it is empty).
    #[error("frame has no string `type` field")]
    MissingType,

    /// A binary frame did not carry UTF-8 text.
    #[error("binary frame is not UTF-8 text")]
    NonUtf8Binary,

    /// The frame exceeds the configured size limit.
    #[error("frame of {len} bytes exceeds limit of {limit} bytes")]
    Oversized {
        /// Frame length in bytes.
        len: usize,
        /// Configured limit in bytes.
        limit: usize,
    },
}

impl DecodeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DecodeError::Malformed { .. } => "decode_malformed",
            DecodeError::NotAnObject => "decode_not_an_object",
            DecodeError::MissingType => "decode_missing_type",
            DecodeError::NonUtf8Binary => "decode_non_utf8",
            DecodeError::Oversized { .. } => "decode_oversized",
        }
    }

    /// Indicates whether the session should be torn down.
    ///
    /// # Example
    /// ```
    /// use sockvisor::DecodeError;
    ///
    /// assert!(!DecodeError::MissingType.is_fatal());
    /// assert!(DecodeError::NonUtf8Binary.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DecodeError::NonUtf8Binary | DecodeError::Oversized { .. }
        )
    }
}

/// # Errors returned synchronously by the public API.
///
/// These never change the connection state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// An envelope or subscription was given an empty `type`.
    #[error("message type must not be empty")]
    EmptyType,

    /// A chat message had no text after trimming.
    #[error("chat message must not be empty")]
    EmptyMessage,

    /// The payload could not be serialized to JSON.
    #[error("payload is not serializable: {reason}")]
    InvalidPayload {
        /// Serializer message.
        reason: String,
    },

    /// The configured endpoint is not a usable socket URL.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The supervisor task is gone (runtime shut down).
    #[error("client is closed")]
    Closed,
}

impl ClientError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ClientError::EmptyType => "client_empty_type",
            ClientError::EmptyMessage => "client_empty_message",
            ClientError::InvalidPayload { .. } => "client_invalid_payload",
            ClientError::InvalidEndpoint { .. } => "client_invalid_endpoint",
            ClientError::Closed => "client_closed",
        }
    }
}

/// # Faults absorbed by the client and surfaced through the error hook.
///
/// None of these cross the public API as a returned error.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// A connection attempt failed or an open session dropped.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An inbound frame could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A subscriber callback panicked during dispatch.
    #[error("subscriber for {topic:?} panicked: {info}")]
    Subscriber {
        /// Event type being dispatched.
        topic: Arc<str>,
        /// Panic message.
        info: Arc<str>,
    },

    /// A lifecycle observer panicked while handling an event.
    #[error("observer {observer:?} panicked: {info}")]
    Observer {
        /// Observer name.
        observer: Arc<str>,
        /// Panic message.
        info: Arc<str>,
    },

    /// The reconnect policy ran out of attempts.
    #[error("reconnect policy exhausted after {attempts} failed attempts")]
    PolicyExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },
}

impl Fault {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Fault::Transport(e) => e.as_label(),
            Fault::Decode(e) => e.as_label(),
            Fault::Subscriber { .. } => "subscriber_panicked",
            Fault::Observer { .. } => "observer_panicked",
            Fault::PolicyExhausted { .. } => "policy_exhausted",
        }
    }
}

/// Renders a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_protocol_violations_are_fatal() {
        assert!(
            !DecodeError::Malformed {
                reason: "eof".into()
            }
            .is_fatal()
        );
        assert!(!DecodeError::NotAnObject.is_fatal());
        assert!(!DecodeError::MissingType.is_fatal());
        assert!(DecodeError::NonUtf8Binary.is_fatal());
        assert!(DecodeError::Oversized { len: 10, limit: 5 }.is_fatal());
    }

    #[test]
    fn fault_labels_delegate_to_source() {
        let fault = Fault::from(TransportError::io("reset"));
        assert_eq!(fault.as_label(), "transport_io");

        let fault = Fault::from(DecodeError::MissingType);
        assert_eq!(fault.as_label(), "decode_missing_type");
    }

    #[test]
    fn panic_payloads_render() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");

        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
