//! # MetricsFeed: latest metrics snapshot over the channel.
//!
//! ```text
//!      state watch → Open ─┐        refresh tick (only while Open)
//!                              ▼                  │
//!   feed task ──► client.send(request_metrics) ◄──┘
//!
//!   initial_metrics ──► replace ─┐
//!   metrics_update  ──► merge   ─┼──► watch<Option<MetricsReading>>
//!   seed(fallback)  ──► only if no channel snapshot yet
//! ```
//!
//! The channel is authoritative: once a snapshot arrived over the channel, a
//! fallback from [`MetricsFeed::seed`] is ignored.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::{Client, next_tick};
use crate::error::ClientError;
use crate::protocol::{self, MetricsCategory, MetricsSnapshot};
use crate::router::{Envelope, SubscriptionHandle};

/// Where the current reading came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    /// Supplied by [`MetricsFeed::seed`] (e.g. an HTTP snapshot).
    Fallback,
    /// Delivered over the channel.
    Channel,
}

/// A snapshot and its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReading {
    pub snapshot: MetricsSnapshot,
    pub source: SnapshotSource,
}

/// Settings for [`MetricsFeed`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Category requested on connect and on refresh.
    pub category: MetricsCategory,
    /// Refresh interval while `Open` (`0s` = only on connect).
    pub refresh: Duration,
}

impl Default for FeedConfig {
    /// `category = all`, `refresh = 30s`.
    fn default() -> Self {
        Self {
            category: MetricsCategory::All,
            refresh: Duration::from_secs(30),
        }
    }
}

/// Keeps the latest metrics snapshot for one client.
///
/// Dropping the feed removes its subscriptions and stops its request task.
pub struct MetricsFeed {
    client: Client,
    latest: Arc<watch::Sender<Option<MetricsReading>>>,
    handles: [SubscriptionHandle; 2],
    category: MetricsCategory,
    token: CancellationToken,
}

impl MetricsFeed {
    /// Subscribes to the metric events of `client` and starts requesting snapshots.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn attach(client: &Client, cfg: FeedConfig) -> Result<Self, ClientError> {
        let (tx, _rx) = watch::channel(None);
        let latest = Arc::new(tx);

        let initial = {
            let latest = Arc::clone(&latest);
            client.subscribe(protocol::INITIAL_METRICS, move |env: &Envelope| {
                apply(&latest, env, true);
            })?
        };
        let update = {
            let latest = Arc::clone(&latest);
            client.subscribe(protocol::METRICS_UPDATE, move |env: &Envelope| {
                apply(&latest, env, false);
            })
        };
        let update = match update {
            Ok(h) => h,
            Err(e) => {
                client.unsubscribe(initial);
                return Err(e);
            }
        };

        let token = CancellationToken::new();
        spawn_requester(client.clone(), cfg.clone(), token.clone());

        Ok(Self {
            client: client.clone(),
            latest,
            handles: [initial, update],
            category: cfg.category,
            token,
        })
    }

    /// Latest reading, if any.
    pub fn latest(&self) -> Option<MetricsReading> {
        self.latest.borrow().clone()
    }

    /// Watch channel of the latest reading.
    pub fn watch(&self) -> watch::Receiver<Option<MetricsReading>> {
        self.latest.subscribe()
    }

    /// Seeds a fallback snapshot. Returns `false` if a channel snapshot already exists.
    pub fn seed(&self, snapshot: MetricsSnapshot) -> bool {
        self.latest.send_if_modified(|cur| {
            if cur
                .as_ref()
                .is_some_and(|r| r.source == SnapshotSource::Channel)
            {
                return false;
            }
            *cur = Some(MetricsReading {
                snapshot,
                source: SnapshotSource::Fallback,
            });
            true
        })
    }

    /// Requests a snapshot now (queued if not `Open`).
    pub fn request_now(&self) -> Result<(), ClientError> {
        self.client
            .send_envelope(protocol::request_metrics(self.category))
    }
}

impl Drop for MetricsFeed {
    fn drop(&mut self) {
        self.token.cancel();
        for h in self.handles {
            self.client.unsubscribe(h);
        }
    }
}

fn apply(latest: &watch::Sender<Option<MetricsReading>>, env: &Envelope, replace: bool) {
    let snapshot = match MetricsSnapshot::from_envelope(env) {
        Ok(s) => s,
        Err(e) => {
            warn!(kind = env.kind(), err = %e, "ignoring malformed metrics payload");
            return;
        }
    };

    latest.send_modify(|cur| {
        let merge_into = cur
            .as_mut()
            .filter(|r| !replace && r.source == SnapshotSource::Channel);
        if let Some(reading) = merge_into {
            reading.snapshot.merge(snapshot);
            return;
        }
        *cur = Some(MetricsReading {
            snapshot,
            source: SnapshotSource::Channel,
        });
    });
}

fn spawn_requester(client: Client, cfg: FeedConfig, token: CancellationToken) {
    let mut state = client.state_watch();
    let request = move |client: &Client| {
        if let Err(e) = client.send_envelope(protocol::request_metrics(cfg.category)) {
            debug!(err = %e, "metrics request not sent");
        }
    };

    tokio::spawn(async move {
        // Marks the current state as seen, so an Open already in place is
        // requested here and never again by `changed()`.
        if state.borrow_and_update().is_open() {
            request(&client);
        }

        let mut refresh = (cfg.refresh > Duration::ZERO).then(|| {
            let mut iv = time::interval_at(Instant::now() + cfg.refresh, cfg.refresh);
            iv.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            iv
        });

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                res = state.changed() => {
                    if res.is_err() {
                        break;
                    }
                    // Transitions coalesce in the watch: `Open → … → Open`
                    // between two polls still reads as one change to `Open`.
                    if state.borrow_and_update().is_open() {
                        request(&client);
                    }
                }
                () = next_tick(&mut refresh) => {
                    if client.state().is_open() {
                        request(&client);
                    }
                }
            }
        }
    });
}
