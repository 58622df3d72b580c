//! # Reserved message types of the metrics channel.
//!
//! ```text
//! client → server   chat_message      {"text": "…"}
//!                   request_metrics   {"category": "all" | "assets" | "network" | "power"}
//!                   ping
//! server → client   initial_metrics   MetricsSnapshot (once after connect)
//!                   metrics_update    MetricsSnapshot
//!                   pong              {"timestamp": …}
//!                   error             {"message": "…"}
//! ```
//!
//! Metric groups (`assets`, `networks`, `power`) are opaque JSON records; unknown
//! top-level keys are kept in [`MetricsSnapshot::extra`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::ClientError;
use crate::router::{Envelope, PayloadLayout};

pub const CHAT_MESSAGE: &str = "chat_message";
pub const REQUEST_METRICS: &str = "request_metrics";
pub const PING: &str = "ping";

pub const INITIAL_METRICS: &str = "initial_metrics";
pub const METRICS_UPDATE: &str = "metrics_update";
pub const PONG: &str = "pong";
pub const ERROR: &str = "error";

/// Metric group selector for `request_metrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsCategory {
    #[default]
    All,
    Assets,
    Network,
    Power,
}

impl MetricsCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricsCategory::All => "all",
            MetricsCategory::Assets => "assets",
            MetricsCategory::Network => "network",
            MetricsCategory::Power => "power",
        }
    }
}

/// Builds a `chat_message` command. Rejects text that is empty after trimming.
pub fn chat_message(text: &str) -> Result<Envelope, ClientError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ClientError::EmptyMessage);
    }
    Ok(Envelope::reserved(CHAT_MESSAGE, json!({ "text": text })))
}

/// Builds a `request_metrics` command.
///
/// The server reads `category` next to `type`, so this command is always
/// sent flattened: `{"type":"request_metrics","category":"all"}`.
pub fn request_metrics(category: MetricsCategory) -> Envelope {
    Envelope::reserved(REQUEST_METRICS, json!({ "category": category.as_str() }))
        .with_layout(PayloadLayout::Flattened)
}

/// Builds a `ping` command.
pub fn ping() -> Envelope {
    Envelope::reserved(PING, Value::Null)
}

/// Payload of `initial_metrics` and `metrics_update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<Value>,
    /// Groups this client does not know about.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MetricsSnapshot {
    /// Reads a snapshot from an event payload. A `null` payload is an empty snapshot.
    pub fn from_envelope(env: &Envelope) -> Result<Self, serde_json::Error> {
        match env.payload() {
            Value::Null => Ok(Self::default()),
            _ => env.payload_as(),
        }
    }

    /// Overwrites every group present in `newer`; groups it lacks are kept.
    pub fn merge(&mut self, newer: MetricsSnapshot) {
        if newer.assets.is_some() {
            self.assets = newer.assets;
        }
        if newer.networks.is_some() {
            self.networks = newer.networks;
        }
        if newer.power.is_some() {
            self.power = newer.power;
        }
        self.extra.extend(newer.extra);
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_none() && self.networks.is_none() && self.power.is_none() && self.extra.is_empty()
    }
}

/// Payload of a server `error` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: String,
}
