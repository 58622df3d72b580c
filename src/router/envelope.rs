//! Typed message envelope.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ClientError;

use super::PayloadLayout;

/// A routed message: a non-empty `type` plus a JSON payload.
///
/// Server→client envelopes are events, client→server envelopes are commands.
/// Immutable once built.
///
/// # Example
/// ```
/// use serde_json::json;
/// use sockvisor::Envelope;
///
/// let env = Envelope::new("request_metrics", json!({"category": "all"})).unwrap();
/// assert_eq!(env.kind(), "request_metrics");
/// assert!(Envelope::new("", json!(null)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    kind: String,
    payload: Value,
    layout: Option<PayloadLayout>,
}

impl Envelope {
    /// Builds an envelope. Rejects an empty type.
    pub fn new(kind: impl Into<String>, payload: Value) -> Result<Self, ClientError> {
        let kind = kind.into();
        if kind.trim().is_empty() {
            return Err(ClientError::EmptyType);
        }
        Ok(Self {
            kind,
            payload,
            layout: None,
        })
    }

    /// Builds an envelope from any serializable payload.
    pub fn from_serialize<T: Serialize + ?Sized>(
        kind: impl Into<String>,
        payload: &T,
    ) -> Result<Self, ClientError> {
        let payload = serde_json::to_value(payload).map_err(|e| ClientError::InvalidPayload {
            reason: e.to_string(),
        })?;
        Self::new(kind, payload)
    }

    /// Builds an envelope for a reserved, known non-empty type.
    pub(crate) fn reserved(kind: &'static str, payload: Value) -> Self {
        debug_assert!(!kind.is_empty());
        Self {
            kind: kind.to_owned(),
            payload,
            layout: None,
        }
    }

    /// Pins the wire layout of this envelope, overriding the client's
    /// `payload_layout`.
    pub fn with_layout(mut self, layout: PayloadLayout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// The pinned wire layout, if any.
    pub fn layout(&self) -> Option<PayloadLayout> {
        self.layout
    }

    /// The routing type.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The payload.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Deserializes the payload into `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    pub fn into_parts(self) -> (String, Value) {
        (self.kind, self.payload)
    }
}
