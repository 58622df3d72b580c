//! MetricsFeed over a scripted session.

mod common;

use std::time::Duration;

use serde_json::json;
use sockvisor::{
    EventKind, FeedConfig, MetricsFeed, MetricsReading, MetricsSnapshot, SnapshotSource,
    protocol,
};
use tokio::sync::watch;
use tokio::time::timeout;

use common::{Outcome, ScriptedTransport, WAIT, client, config, next_event};

async fn reading_where(
    rx: &mut watch::Receiver<Option<MetricsReading>>,
    pred: impl FnMut(&Option<MetricsReading>) -> bool,
) -> MetricsReading {
    let current = timeout(WAIT, rx.wait_for(pred))
        .await
        .expect("reading never arrived")
        .expect("feed dropped");
    (*current).clone().expect("reading present")
}

#[tokio::test(start_paused = true)]
async fn feed_requests_on_connect_and_tracks_the_channel() {
    let (transport, mut servers) = ScriptedTransport::new([], Outcome::Accept);
    let client = client(config(), transport);
    let feed = MetricsFeed::attach(&client, FeedConfig::default()).unwrap();
    let mut watch = feed.watch();

    let fallback = MetricsSnapshot {
        assets: Some(json!({"total": 1})),
        ..MetricsSnapshot::default()
    };
    assert!(feed.seed(fallback.clone()));
    assert_eq!(
        feed.latest(),
        Some(MetricsReading {
            snapshot: fallback.clone(),
            source: SnapshotSource::Fallback,
        })
    );

    client.start().unwrap();
    let mut server = servers.next().await;
    assert_eq!(
        server.recv_json().await,
        json!({"type": "request_metrics", "category": "all"})
    );

    server.send_json(json!({
        "type": "initial_metrics",
        "data": {"assets": {"total": 40}, "power": {"kw": 12}}
    }));
    let initial = reading_where(&mut watch, |r| {
        r.as_ref().is_some_and(|r| r.source == SnapshotSource::Channel)
    })
    .await;
    assert_eq!(initial.snapshot.assets, Some(json!({"total": 40})));

    // The channel is authoritative from here on.
    assert!(!feed.seed(fallback));
    assert_eq!(feed.latest().unwrap().source, SnapshotSource::Channel);

    server.send_json(json!({"type": "metrics_update", "data": {"power": {"kw": 15}}}));
    let merged = reading_where(&mut watch, |r| {
        r.as_ref()
            .is_some_and(|r| r.snapshot.power == Some(json!({"kw": 15})))
    })
    .await;
    assert_eq!(merged.snapshot.assets, Some(json!({"total": 40})));

    // Periodic refresh while open.
    let before = tokio::time::Instant::now();
    assert_eq!(
        server.recv_json().await,
        json!({"type": "request_metrics", "category": "all"})
    );
    assert!(before.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn feed_rerequests_after_reconnect() {
    let (transport, mut servers) = ScriptedTransport::new([], Outcome::Accept);
    let client = client(config(), transport);
    let cfg = FeedConfig {
        category: protocol::MetricsCategory::Power,
        refresh: Duration::ZERO,
    };
    let _feed = MetricsFeed::attach(&client, cfg).unwrap();
    let expected = json!({"type": "request_metrics", "category": "power"});

    client.start().unwrap();
    let mut first = servers.next().await;
    assert_eq!(first.recv_json().await, expected);

    drop(first);
    let mut second = servers.next().await;
    assert_eq!(second.recv_json().await, expected);
}

#[tokio::test(start_paused = true)]
async fn feed_attached_mid_flush_requests_once() {
    let (transport, mut servers) = ScriptedTransport::new(
        [Outcome::AcceptSlowWrites(Duration::from_secs(1))],
        Outcome::Accept,
    );
    let client = client(config(), transport);
    let mut events = client.events();

    client.send("queued", &json!(1)).unwrap();
    client.send("queued", &json!(2)).unwrap();
    client.start().unwrap();
    let mut server = servers.next().await;

    // Open is visible while the queue is still being written, before Connected.
    common::wait_for_state(&client, sockvisor::ConnectionState::Open).await;
    let cfg = FeedConfig {
        refresh: Duration::ZERO,
        ..FeedConfig::default()
    };
    let _feed = MetricsFeed::attach(&client, cfg).unwrap();

    next_event(&mut events, EventKind::Connected).await;
    assert_eq!(server.recv_json().await, json!({"type": "queued", "data": 1}));
    assert_eq!(server.recv_json().await, json!({"type": "queued", "data": 2}));
    assert_eq!(
        server.recv_json().await,
        json!({"type": "request_metrics", "category": "all"})
    );

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(server.nothing_pending());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_feed_removes_its_subscriptions() {
    let (transport, _servers) = ScriptedTransport::new([], Outcome::Accept);
    let client = client(config(), transport);

    let feed = MetricsFeed::attach(&client, FeedConfig::default()).unwrap();
    assert_eq!(client.subscriber_count(protocol::INITIAL_METRICS), 1);
    assert_eq!(client.subscriber_count(protocol::METRICS_UPDATE), 1);

    drop(feed);
    assert_eq!(client.subscriber_count(protocol::INITIAL_METRICS), 0);
    assert_eq!(client.subscriber_count(protocol::METRICS_UPDATE), 0);
}
