//! # Client configuration.
//!
//! Provides [`ClientConfig`], the settings for one client instance, and
//! [`Endpoint`], a validated socket URL.
//!
//! ## Sentinel values
//! - `connect_timeout = 0s` → no connect timeout
//! - `close_timeout = 0s` → send the close frame without waiting for the peer
//! - `heartbeat = 0s` → no application heartbeat
//! - `queue_ttl = 0s` → queued commands never expire
//! - `max_frame_len = 0` → no inbound size limit

use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::ClientError;
use crate::policies::{AttemptLimit, BackoffPolicy};
use crate::router::{Codec, PayloadLayout};

/// A validated `ws://` or `wss://` URL.
///
/// `http`/`https` are accepted and mapped to `ws`/`wss`.
///
/// # Example
/// ```
/// use sockvisor::Endpoint;
///
/// let ep = Endpoint::from_origin("https://dash.example.com", "/ws/chat/").unwrap();
/// assert_eq!(ep.as_str(), "wss://dash.example.com/ws/chat/");
///
/// let ep = Endpoint::parse("http://localhost:8000/ws/chat/").unwrap();
/// assert_eq!(ep.as_str(), "ws://localhost:8000/ws/chat/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Parses and normalizes an endpoint.
    pub fn parse(raw: &str) -> Result<Self, ClientError> {
        let invalid = |reason: String| ClientError::InvalidEndpoint {
            endpoint: raw.to_owned(),
            reason,
        };

        let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        let scheme = match url.scheme() {
            "ws" | "http" => "ws",
            "wss" | "https" => "wss",
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        };
        if url.scheme() != scheme {
            url.set_scheme(scheme)
                .map_err(|()| invalid("cannot switch scheme".into()))?;
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".into()));
        }
        Ok(Self(url))
    }

    /// Builds an endpoint from a page origin and a path.
    ///
    /// A secure origin (`https`) yields a secure socket (`wss`).
    pub fn from_origin(origin: &str, path: &str) -> Result<Self, ClientError> {
        let base = Self::parse(origin)?;
        let url = base
            .0
            .join(path)
            .map_err(|e| ClientError::InvalidEndpoint {
                endpoint: format!("{origin}{path}"),
                reason: e.to_string(),
            })?;
        Ok(Self(url))
    }

    pub fn url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// True for `wss`.
    pub fn is_secure(&self) -> bool {
        self.0.scheme() == "wss"
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one client.
///
/// ## Field semantics
/// - `endpoint`: socket URL, validated at build time
/// - `backoff`, `max_attempts`: reconnect policy
/// - `queue_capacity`: outbound queue bound (min 1; oldest dropped on overflow)
/// - `bus_capacity`: lifecycle bus ring buffer (min 1)
///
/// All fields are public; the helper accessors resolve the `0` sentinels.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Socket URL (`ws`, `wss`, `http`, `https`).
    pub endpoint: String,

    /// Delay schedule between failed attempts.
    pub backoff: BackoffPolicy,

    /// Consecutive failed attempts before giving up (`ClosedTerminal`).
    pub max_attempts: AttemptLimit,

    /// Pending commands kept while not `Open`.
    pub queue_capacity: usize,

    /// Max age of a pending command at flush time (`0s` = unlimited).
    pub queue_ttl: Duration,

    /// Limit for a single connection attempt (`0s` = none).
    pub connect_timeout: Duration,

    /// Limit for the close handshake (`0s` = send close, don't wait for the peer).
    pub close_timeout: Duration,

    /// Interval of `ping` commands while `Open` (`0s` = off).
    pub heartbeat: Duration,

    /// Largest accepted inbound frame in bytes (`0` = unlimited).
    pub max_frame_len: usize,

    /// Outbound payload layout.
    pub payload_layout: PayloadLayout,

    /// Capacity of the lifecycle event bus.
    pub bus_capacity: usize,
}

impl ClientConfig {
    /// Default configuration pointed at `endpoint`.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Parses [`Self::endpoint`].
    pub fn endpoint(&self) -> Result<Endpoint, ClientError> {
        Endpoint::parse(&self.endpoint)
    }

    #[inline]
    pub fn connect_timeout(&self) -> Option<Duration> {
        non_zero(self.connect_timeout)
    }

    #[inline]
    pub fn close_timeout(&self) -> Option<Duration> {
        non_zero(self.close_timeout)
    }

    #[inline]
    pub fn heartbeat(&self) -> Option<Duration> {
        non_zero(self.heartbeat)
    }

    #[inline]
    pub fn queue_ttl(&self) -> Option<Duration> {
        non_zero(self.queue_ttl)
    }

    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Codec built from the wire settings.
    pub fn codec(&self) -> Codec {
        Codec::new(self.payload_layout, self.max_frame_len)
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    (d != Duration::ZERO).then_some(d)
}

impl Default for ClientConfig {
    /// Default configuration:
    ///
    /// - `endpoint = ws://127.0.0.1:8000/ws/chat/`
    /// - `backoff = 5s → 60s`, doubling, no jitter
    /// - `max_attempts = 10`
    /// - `queue_capacity = 256`, no TTL
    /// - `connect_timeout = 10s`, `close_timeout = 5s`
    /// - heartbeat off
    /// - `max_frame_len = 1 MiB`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:8000/ws/chat/".into(),
            backoff: BackoffPolicy::default(),
            max_attempts: AttemptLimit::default(),
            queue_capacity: 256,
            queue_ttl: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(5),
            heartbeat: Duration::ZERO,
            max_frame_len: 1024 * 1024,
            payload_layout: PayloadLayout::Nested,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_endpoints() {
        assert!(matches!(
            Endpoint::parse("ftp://example.com"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            Endpoint::parse("not a url"),
            Err(ClientError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn insecure_origin_maps_to_ws() {
        let ep = Endpoint::from_origin("http://127.0.0.1:8000", "/ws/chat/").unwrap();
        assert_eq!(ep.as_str(), "ws://127.0.0.1:8000/ws/chat/");
        assert!(!ep.is_secure());
    }

    #[test]
    fn sentinels_resolve_to_none() {
        let cfg = ClientConfig {
            connect_timeout: Duration::ZERO,
            queue_capacity: 0,
            ..ClientConfig::default()
        };
        assert_eq!(cfg.connect_timeout(), None);
        assert_eq!(cfg.heartbeat(), None);
        assert_eq!(cfg.queue_ttl(), None);
        assert_eq!(cfg.close_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.queue_capacity_clamped(), 1);
        assert!(cfg.endpoint().is_ok());
    }
}
