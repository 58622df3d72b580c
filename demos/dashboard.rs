//! # Example: dashboard
//!
//! A headless data-center dashboard: keeps a metrics snapshot up to date over
//! the channel, prints heartbeat replies, and forwards stdin lines as chat messages.
//!
//! ## Flow
//! ```text
//! Client::builder(cfg).with_observers([LogWriter]).build()
//!   ├─► MetricsFeed::attach()          (request on connect, refresh every 30s)
//!   ├─► subscribe("pong" / "error")    (print replies)
//!   ├─► on_state_change / on_error     (print lifecycle)
//!   ├─► start()
//!   ├─► stdin line ──► chat_message
//!   └─► Ctrl-C ──► stop()
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=sockvisor=debug cargo run --example dashboard -- ws://127.0.0.1:8000/ws/chat/
//! ```

use std::sync::Arc;
use std::time::Duration;

use sockvisor::{
    AttemptLimit, BackoffPolicy, Client, ClientConfig, Envelope, FeedConfig, JitterPolicy,
    LogWriter, MetricsFeed, Observer, protocol,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let endpoint = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8000/ws/chat/".to_string());

    let cfg = ClientConfig {
        backoff: BackoffPolicy::exponential(Duration::from_secs(1), Duration::from_secs(30))
            .with_jitter(JitterPolicy::Equal),
        max_attempts: AttemptLimit::Max(10),
        heartbeat: Duration::from_secs(20),
        ..ClientConfig::new(endpoint)
    };

    let observers: Vec<Arc<dyn Observer>> = vec![Arc::new(LogWriter)];
    let client = Client::builder(cfg).with_observers(observers).build()?;

    let feed = MetricsFeed::attach(&client, FeedConfig::default())?;
    let mut readings = feed.watch();
    tokio::spawn(async move {
        while readings.changed().await.is_ok() {
            let Some(reading) = readings.borrow_and_update().clone() else {
                continue;
            };
            println!(
                "[metrics:{:?}] assets={} networks={} power={}",
                reading.source,
                show(&reading.snapshot.assets),
                show(&reading.snapshot.networks),
                show(&reading.snapshot.power),
            );
        }
    });

    client.subscribe(protocol::PONG, |env: &Envelope| {
        println!("[pong] {}", env.payload());
    })?;
    client.subscribe(protocol::ERROR, |env: &Envelope| {
        if let Ok(err) = env.payload_as::<protocol::ServerError>() {
            println!("[server error] {}", err.message);
        }
    })?;

    let _state = client.on_state_change(|from, to| println!("[state] {from} -> {to}"));
    let _errors = client.on_error(|fault| println!("[fault] {fault}"));

    client.start()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => match protocol::chat_message(&line) {
                    Ok(cmd) => client.send_envelope(cmd)?,
                    Err(e) => println!("[skip] {e}"),
                },
                None => break,
            },
        }
    }

    client.stop()?;
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(())
}

fn show(group: &Option<serde_json::Value>) -> String {
    group
        .as_ref()
        .map_or_else(|| "-".to_string(), |v| v.to_string())
}
