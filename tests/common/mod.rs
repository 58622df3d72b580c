//! Scripted in-memory transport shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, timeout};
use url::Url;

use sockvisor::{
    Client, ClientConfig, ConnectionState, Event, EventKind, Frame, Session, Transport,
    TransportError,
};

pub const WAIT: Duration = Duration::from_secs(3600);

/// What the next `connect()` does.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// Fail immediately with `TransportError::Connect`.
    Refuse,
    /// Open a session immediately.
    Accept,
    /// Open a session after the given delay.
    AcceptAfter(Duration),
    /// Open a session after `delay` whose writes fail once `ok_sends`
    /// frames have been delivered.
    AcceptBreaking { delay: Duration, ok_sends: usize },
    /// Open a session immediately; each write takes the given time.
    AcceptSlowWrites(Duration),
    /// Never resolve.
    Hang,
}

struct Script {
    outcomes: VecDeque<Outcome>,
    fallback: Outcome,
    attempts: Vec<Instant>,
}

/// Transport whose connection attempts follow a script.
pub struct ScriptedTransport {
    script: Mutex<Script>,
    live: Arc<AtomicUsize>,
    max_live: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    servers: mpsc::UnboundedSender<ServerEnd>,
}

impl ScriptedTransport {
    /// `outcomes` are consumed in order; `fallback` is used afterwards.
    pub fn new(
        outcomes: impl IntoIterator<Item = Outcome>,
        fallback: Outcome,
    ) -> (Arc<Self>, Servers) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            script: Mutex::new(Script {
                outcomes: outcomes.into_iter().collect(),
                fallback,
                attempts: Vec::new(),
            }),
            live: Arc::new(AtomicUsize::new(0)),
            max_live: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
            servers: tx,
        });
        (transport, Servers { rx })
    }

    /// Instants at which `connect()` was called.
    pub fn attempts(&self) -> Vec<Instant> {
        self.script.lock().attempts.clone()
    }

    pub fn attempt_count(&self) -> usize {
        self.script.lock().attempts.len()
    }

    /// Sessions currently alive (not yet dropped).
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously alive sessions.
    pub fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    /// Number of `Session::close` calls across all sessions.
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn open(&self, sends_left: Option<usize>, write_delay: Duration) -> Box<dyn Session> {
        let (to_client, inbound) = mpsc::unbounded_channel();
        let (outbound, from_client) = mpsc::unbounded_channel();

        let now_live = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_live.fetch_max(now_live, Ordering::SeqCst);

        let _ = self.servers.send(ServerEnd {
            to_client,
            from_client,
        });
        Box::new(ScriptedSession {
            inbound,
            outbound,
            sends_left,
            write_delay,
            live: Arc::clone(&self.live),
            closes: Arc::clone(&self.closes),
        })
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, endpoint: &Url) -> Result<Box<dyn Session>, TransportError> {
        let outcome = {
            let mut script = self.script.lock();
            script.attempts.push(Instant::now());
            let fallback = script.fallback;
            script.outcomes.pop_front().unwrap_or(fallback)
        };

        match outcome {
            Outcome::Refuse => Err(TransportError::Connect {
                endpoint: endpoint.to_string(),
                reason: "connection refused".into(),
            }),
            Outcome::Accept => Ok(self.open(None, Duration::ZERO)),
            Outcome::AcceptAfter(delay) => {
                tokio::time::sleep(delay).await;
                Ok(self.open(None, Duration::ZERO))
            }
            Outcome::AcceptBreaking { delay, ok_sends } => {
                tokio::time::sleep(delay).await;
                Ok(self.open(Some(ok_sends), Duration::ZERO))
            }
            Outcome::AcceptSlowWrites(write_delay) => Ok(self.open(None, write_delay)),
            Outcome::Hang => std::future::pending().await,
        }
    }
}

struct ScriptedSession {
    inbound: mpsc::UnboundedReceiver<Result<Frame, TransportError>>,
    outbound: mpsc::UnboundedSender<Frame>,
    sends_left: Option<usize>,
    write_delay: Duration,
    live: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Drop for ScriptedSession {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if let Some(left) = self.sends_left.as_mut() {
            if *left == 0 {
                return Err(TransportError::io("write failed"));
            }
            *left -= 1;
        }
        self.outbound
            .send(frame)
            .map_err(|_| TransportError::io("server end dropped"))
    }

    async fn recv(&mut self) -> Result<Frame, TransportError> {
        match self.inbound.recv().await {
            Some(res) => res,
            None => Err(TransportError::Closed {
                code: None,
                reason: "server end dropped".into(),
            }),
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Stream of server ends, one per accepted session.
pub struct Servers {
    rx: mpsc::UnboundedReceiver<ServerEnd>,
}

impl Servers {
    pub async fn next(&mut self) -> ServerEnd {
        timeout(WAIT, self.rx.recv())
            .await
            .expect("no session was opened")
            .expect("transport dropped")
    }
}

/// The server side of one scripted session. Dropping it closes the session.
pub struct ServerEnd {
    to_client: mpsc::UnboundedSender<Result<Frame, TransportError>>,
    from_client: mpsc::UnboundedReceiver<Frame>,
}

impl ServerEnd {
    pub fn send_text(&self, text: &str) {
        let _ = self.to_client.send(Ok(Frame::Text(text.to_owned())));
    }

    pub fn send_json(&self, value: Value) {
        self.send_text(&value.to_string());
    }

    pub fn send_frame(&self, frame: Frame) {
        let _ = self.to_client.send(Ok(frame));
    }

    pub fn fail(&self, err: TransportError) {
        let _ = self.to_client.send(Err(err));
    }

    /// Next frame the client wrote, parsed as JSON.
    pub async fn recv_json(&mut self) -> Value {
        let frame = timeout(WAIT, self.from_client.recv())
            .await
            .expect("client sent nothing")
            .expect("session dropped");
        match frame {
            Frame::Text(text) => serde_json::from_str(&text).expect("client sent invalid json"),
            Frame::Binary(_) => panic!("client sent a binary frame"),
        }
    }

    /// True if the client wrote nothing that is already buffered.
    pub fn nothing_pending(&mut self) -> bool {
        self.from_client.try_recv().is_err()
    }
}

/// Builds a client over `transport`.
pub fn client(cfg: ClientConfig, transport: Arc<ScriptedTransport>) -> Client {
    Client::builder(cfg)
        .with_transport(transport)
        .build()
        .expect("valid config")
}

/// Config with a 1s → 60s doubling backoff and no timeouts.
pub fn config() -> ClientConfig {
    ClientConfig {
        backoff: sockvisor::BackoffPolicy::exponential(
            Duration::from_secs(1),
            Duration::from_secs(60),
        ),
        connect_timeout: Duration::ZERO,
        close_timeout: Duration::ZERO,
        ..ClientConfig::new("ws://test.invalid/ws/chat/")
    }
}

pub async fn wait_for_state(client: &Client, target: ConnectionState) {
    let mut rx = client.state_watch();
    timeout(WAIT, rx.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("state never became {target}"))
        .expect("supervisor gone");
}

/// Polls `cond` every millisecond until it holds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

/// Next event of the given kind.
pub async fn next_event(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event"))
}

/// Collects `(from, to)` transitions until `last` is reached.
pub async fn transitions_until(
    rx: &mut broadcast::Receiver<Event>,
    last: ConnectionState,
) -> Vec<(ConnectionState, ConnectionState)> {
    let mut out = Vec::new();
    loop {
        let ev = next_event(rx, EventKind::StateChanged).await;
        let (Some(from), Some(to)) = (ev.from, ev.to) else {
            continue;
        };
        out.push((from, to));
        if to == last {
            return out;
        }
    }
}
