//! # Frame codec.
//!
//! Encodes outbound [`Envelope`]s to JSON text and decodes inbound [`Frame`]s.
//!
//! ```text
//! Nested     {"type":"request_metrics","data":{"category":"all"}}
//! Flattened  {"type":"request_metrics","category":"all"}
//! ```
//!
//! Decoding takes the payload from `data`, else `payload`, else whatever fields
//! sit next to `type`:
//!
//! ```text
//! {"type":"metrics_update","data":{…}}       payload = {…}
//! {"type":"error","message":"bad category"}  payload = {"message":"bad category"}
//! {"type":"pong"}                            payload = null
//! ```
//!
//! Decoding never panics; every rejection is a [`DecodeError`].

use serde_json::{Map, Value};

use crate::error::DecodeError;
use crate::transport::Frame;

use super::Envelope;

const TYPE_KEY: &str = "type";
const DATA_KEY: &str = "data";
const PAYLOAD_KEY: &str = "payload";

/// Where an outbound payload goes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadLayout {
    /// `{"type": T, "data": P}`.
    #[default]
    Nested,
    /// Object payload fields sit next to `type`. Non-object payloads fall back to nested.
    Flattened,
}

/// Stateless encoder/decoder.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    /// Outbound payload layout.
    pub layout: PayloadLayout,
    /// Largest accepted inbound frame in bytes (`0` = unlimited).
    pub max_frame_len: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            layout: PayloadLayout::Nested,
            max_frame_len: 0,
        }
    }
}

impl Codec {
    pub fn new(layout: PayloadLayout, max_frame_len: usize) -> Self {
        Self {
            layout,
            max_frame_len,
        }
    }

    /// Encodes an envelope as a JSON text body.
    ///
    /// A layout pinned on the envelope wins over [`Codec::layout`].
    pub fn encode(&self, env: &Envelope) -> String {
        let mut obj = Map::new();
        obj.insert(TYPE_KEY.into(), Value::String(env.kind().to_owned()));

        match (env.layout().unwrap_or(self.layout), env.payload()) {
            (PayloadLayout::Flattened, Value::Object(fields)) => {
                for (k, v) in fields {
                    if k != TYPE_KEY {
                        obj.insert(k.clone(), v.clone());
                    }
                }
            }
            (_, Value::Null) => {}
            (_, payload) => {
                obj.insert(DATA_KEY.into(), payload.clone());
            }
        }
        Value::Object(obj).to_string()
    }

    /// Decodes one inbound frame.
    pub fn decode(&self, frame: &Frame) -> Result<Envelope, DecodeError> {
        if self.max_frame_len > 0 && frame.len() > self.max_frame_len {
            return Err(DecodeError::Oversized {
                len: frame.len(),
                limit: self.max_frame_len,
            });
        }

        let text = match frame {
            Frame::Text(s) => s.as_str(),
            Frame::Binary(b) => std::str::from_utf8(b).map_err(|_| DecodeError::NonUtf8Binary)?,
        };

        let value: Value = serde_json::from_str(text).map_err(|e| DecodeError::Malformed {
            reason: e.to_string(),
        })?;
        let Value::Object(mut obj) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let kind = match obj.remove(TYPE_KEY) {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            _ => return Err(DecodeError::MissingType),
        };

        let payload = if let Some(p) = obj.remove(DATA_KEY) {
            p
        } else if let Some(p) = obj.remove(PAYLOAD_KEY) {
            p
        } else if obj.is_empty() {
            Value::Null
        } else {
            Value::Object(obj)
        };

        Envelope::new(kind, payload).map_err(|_| DecodeError::MissingType)
    }
}
