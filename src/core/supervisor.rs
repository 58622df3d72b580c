//! # Supervisor: the connection actor.
//!
//! One Tokio task per client. It owns the connection state, the attempt counter,
//! the outbound queue and the (single) live session. Client handles talk to it
//! through an unbounded mailbox of [`Control`] messages.
//!
//! ## Phase loop
//! ```text
//! run():
//!   loop {
//!     Idle / Terminal ── Start ─────────────────────────► Connecting
//!     Connecting ── select! { attempt, mailbox }
//!        ├─ opened   → counter=0, Open, flush queue, Connected
//!        ├─ failed   → counter+=1, AttemptFailed ──────► Retrying
//!        └─ Stop     → drop attempt ───────────────────► Closing(→ Idle)
//!     Open ── select! { mailbox, session.recv(), heartbeat }
//!        ├─ Send     → write now (failure: re-queue at tail, Retrying)
//!        ├─ frame    → decode → dispatch
//!        ├─ fatal decode error ────────────────────────► Closing(→ Retrying)
//!        ├─ recv error → ConnectionLost ───────────────► Retrying
//!        └─ Stop     ──────────────────────────────────► Closing(→ Idle)
//!     Retrying
//!        ├─ !limit.allows(counter) → PolicyExhausted ──► Terminal
//!        └─ select! { sleep(backoff.next(counter-1)), mailbox }
//!             ├─ timer → Connecting
//!             └─ Stop  → drop timer ───────────────────► Closing(→ Idle)
//!     Closing ── close session (bounded, or polled once) ──► Idle | Retrying | ClosedTerminal+exit
//!   }
//! ```
//!
//! ## Rules
//! - At most one session exists; it is a local of the `Open` phase and dropped
//!   before the next attempt starts.
//! - At most one reconnect timer exists; it is a local of the `Retrying` phase.
//! - A closed mailbox (every client handle dropped) closes the session and ends the task.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

use crate::core::hooks::StateHooks;
use crate::core::{ClientConfig, ConnectionState, OutboundQueue};
use crate::error::{DecodeError, Fault, TransportError};
use crate::events::{Bus, Event, EventKind};
use crate::protocol;
use crate::router::{Envelope, Router};
use crate::transport::{Session, Transport};

/// Mailbox message from a client handle.
#[derive(Debug)]
pub(crate) enum Control {
    Start,
    Stop,
    Send(Envelope),
}

/// What a `Closing` phase leads to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AfterClose {
    Idle,
    Retry,
    Terminal,
}

enum Phase {
    Idle,
    Connecting,
    Open(Box<dyn Session>),
    Retrying,
    Closing {
        session: Option<Box<dyn Session>>,
        after: AfterClose,
    },
    Terminal,
    Exit,
}

/// Validated transitions, published to the state hooks, the watch channel and the bus.
struct StateCell {
    current: ConnectionState,
    tx: watch::Sender<ConnectionState>,
    hooks: StateHooks,
    bus: Bus,
}

impl StateCell {
    fn set(&mut self, next: ConnectionState) -> bool {
        let from = self.current;
        if !from.can_transition_to(next) {
            warn!(%from, to = %next, "rejected state transition");
            return false;
        }
        self.current = next;
        self.hooks.notify(from, next);
        self.tx.send_replace(next);
        debug!(%from, to = %next, "state");
        self.bus.publish(Event::state_changed(from, next));
        true
    }
}

/// The connection actor.
pub(crate) struct Supervisor {
    cfg: ClientConfig,
    endpoint: Url,
    transport: Arc<dyn Transport>,
    router: Arc<Router>,
    bus: Bus,
    state: StateCell,
    queue: OutboundQueue,
    attempts: u32,
    mailbox: mpsc::UnboundedReceiver<Control>,
}

impl Supervisor {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        cfg: ClientConfig,
        endpoint: Url,
        transport: Arc<dyn Transport>,
        router: Arc<Router>,
        bus: Bus,
        state_tx: watch::Sender<ConnectionState>,
        hooks: StateHooks,
        mailbox: mpsc::UnboundedReceiver<Control>,
    ) -> Self {
        let queue = OutboundQueue::new(cfg.queue_capacity_clamped(), cfg.queue_ttl());
        Self {
            cfg,
            endpoint,
            transport,
            router,
            state: StateCell {
                current: ConnectionState::Idle,
                tx: state_tx,
                hooks,
                bus: bus.clone(),
            },
            bus,
            queue,
            attempts: 0,
            mailbox,
        }
    }

    /// Drives the phase loop until every client handle is dropped.
    pub(crate) async fn run(mut self) {
        info!(endpoint = %self.endpoint, "supervisor started");
        let mut phase = Phase::Idle;
        loop {
            phase = match phase {
                Phase::Idle | Phase::Terminal => self.parked().await,
                Phase::Connecting => self.connecting().await,
                Phase::Open(session) => self.open(session).await,
                Phase::Retrying => self.retrying().await,
                Phase::Closing { session, after } => self.closing(session, after).await,
                Phase::Exit => break,
            };
        }
        info!(endpoint = %self.endpoint, "supervisor stopped");
    }

    /// Idle or ClosedTerminal: wait for `start()`.
    async fn parked(&mut self) -> Phase {
        loop {
            match self.mailbox.recv().await {
                Some(Control::Start) => {
                    self.attempts = 0;
                    self.state.set(ConnectionState::Connecting);
                    return Phase::Connecting;
                }
                Some(Control::Stop) => {}
                Some(Control::Send(env)) => self.enqueue(env),
                None => return Phase::Exit,
            }
        }
    }

    async fn connecting(&mut self) -> Phase {
        let transport = Arc::clone(&self.transport);
        let endpoint = self.endpoint.clone();
        let timeout = self.cfg.connect_timeout();
        debug!(%endpoint, attempt = self.attempts + 1, "connecting");

        let attempt = async move {
            match timeout {
                Some(limit) => time::timeout(limit, transport.connect(&endpoint))
                    .await
                    .unwrap_or(Err(TransportError::Timeout { timeout: limit })),
                None => transport.connect(&endpoint).await,
            }
        };
        tokio::pin!(attempt);

        loop {
            tokio::select! {
                res = &mut attempt => {
                    return match res {
                        Ok(session) => self.opened(session).await,
                        Err(err) => self.attempt_failed(err),
                    };
                }
                ctl = self.mailbox.recv() => match ctl {
                    Some(Control::Start) => {}
                    Some(Control::Send(env)) => self.enqueue(env),
                    Some(Control::Stop) => return self.begin_close(None, AfterClose::Idle),
                    None => return self.begin_close(None, AfterClose::Terminal),
                },
            }
        }
    }

    async fn opened(&mut self, mut session: Box<dyn Session>) -> Phase {
        self.attempts = 0;
        self.state.set(ConnectionState::Open);
        info!(endpoint = %self.endpoint, "connected");

        if let Err(err) = self.flush(session.as_mut()).await {
            return self.lost(err);
        }
        self.bus.publish(Event::new(EventKind::Connected));
        Phase::Open(session)
    }

    async fn open(&mut self, mut session: Box<dyn Session>) -> Phase {
        let mut heartbeat = self.cfg.heartbeat().map(|every| {
            let mut iv = time::interval_at(Instant::now() + every, every);
            iv.set_missed_tick_behavior(MissedTickBehavior::Delay);
            iv
        });

        loop {
            tokio::select! {
                ctl = self.mailbox.recv() => match ctl {
                    Some(Control::Send(env)) => {
                        if let Err(err) = self.write(session.as_mut(), &env).await {
                            self.enqueue(env);
                            return self.lost(err);
                        }
                    }
                    Some(Control::Start) => {}
                    Some(Control::Stop) => return self.begin_close(Some(session), AfterClose::Idle),
                    None => return self.begin_close(Some(session), AfterClose::Terminal),
                },
                frame = session.recv() => match frame {
                    Ok(frame) => match self.router.decode(&frame) {
                        Ok(env) => {
                            self.router.dispatch(&env);
                        }
                        Err(err) => {
                            let fatal = err.is_fatal();
                            self.decode_failed(err);
                            if fatal {
                                return self.begin_close(Some(session), AfterClose::Retry);
                            }
                        }
                    },
                    Err(err) => return self.lost(err),
                },
                () = next_tick(&mut heartbeat) => {
                    if let Err(err) = self.write(session.as_mut(), &protocol::ping()).await {
                        return self.lost(err);
                    }
                }
            }
        }
    }

    async fn retrying(&mut self) -> Phase {
        if !self.cfg.max_attempts.allows(self.attempts) {
            warn!(attempts = self.attempts, "reconnect policy exhausted");
            self.state.set(ConnectionState::ClosedTerminal);
            self.bus.publish(
                Event::new(EventKind::PolicyExhausted)
                    .with_attempt(self.attempts)
                    .with_fault(Fault::PolicyExhausted {
                        attempts: self.attempts,
                    }),
            );
            return Phase::Terminal;
        }

        let delay = self.cfg.backoff.next(self.attempts.saturating_sub(1));
        debug!(attempts = self.attempts, delay_ms = delay.as_millis() as u64, "backoff");
        self.bus.publish(
            Event::new(EventKind::BackoffScheduled)
                .with_attempt(self.attempts)
                .with_delay(delay),
        );

        let timer = time::sleep(delay);
        tokio::pin!(timer);

        loop {
            tokio::select! {
                () = &mut timer => {
                    self.state.set(ConnectionState::Connecting);
                    return Phase::Connecting;
                }
                ctl = self.mailbox.recv() => match ctl {
                    Some(Control::Start) => {}
                    Some(Control::Send(env)) => self.enqueue(env),
                    Some(Control::Stop) => return self.begin_close(None, AfterClose::Idle),
                    None => return self.begin_close(None, AfterClose::Terminal),
                },
            }
        }
    }

    async fn closing(&mut self, session: Option<Box<dyn Session>>, after: AfterClose) -> Phase {
        if let Some(mut session) = session {
            match self.cfg.close_timeout() {
                Some(limit) => {
                    if time::timeout(limit, session.close()).await.is_err() {
                        debug!(?limit, "close handshake timed out");
                    }
                }
                // Polled once: the close frame goes out, the peer's reply is not awaited.
                None => {
                    let _ = session.close().now_or_never();
                }
            }
            drop(session);
        }

        match after {
            AfterClose::Idle => {
                self.state.set(ConnectionState::Idle);
                Phase::Idle
            }
            AfterClose::Retry => {
                self.state.set(ConnectionState::ClosedRetrying);
                Phase::Retrying
            }
            AfterClose::Terminal => {
                self.state.set(ConnectionState::ClosedTerminal);
                Phase::Exit
            }
        }
    }

    fn begin_close(&mut self, session: Option<Box<dyn Session>>, after: AfterClose) -> Phase {
        self.state.set(ConnectionState::Closing);
        Phase::Closing { session, after }
    }

    fn attempt_failed(&mut self, err: TransportError) -> Phase {
        self.attempts = self.attempts.saturating_add(1);
        warn!(attempt = self.attempts, err = %err, "connection attempt failed");
        self.bus.publish(
            Event::new(EventKind::AttemptFailed)
                .with_attempt(self.attempts)
                .with_fault(err),
        );
        self.state.set(ConnectionState::ClosedRetrying);
        Phase::Retrying
    }

    fn lost(&mut self, err: TransportError) -> Phase {
        warn!(err = %err, "connection lost");
        self.bus
            .publish(Event::new(EventKind::ConnectionLost).with_fault(err));
        self.state.set(ConnectionState::ClosedRetrying);
        Phase::Retrying
    }

    fn decode_failed(&self, err: DecodeError) {
        warn!(err = %err, label = err.as_label(), "dropping inbound frame");
        self.bus
            .publish(Event::new(EventKind::DecodeFailed).with_fault(err));
    }

    fn enqueue(&mut self, env: Envelope) {
        if let Some(evicted) = self.queue.push_back(env) {
            debug!(kind = evicted.kind(), "outbound queue full, dropped oldest");
            self.bus.publish(
                Event::new(EventKind::CommandEvicted)
                    .with_topic(evicted.kind())
                    .with_reason("overflow"),
            );
        }
    }

    async fn write(&self, session: &mut dyn Session, env: &Envelope) -> Result<(), TransportError> {
        session.send(self.router.encode(env)).await
    }

    /// Sends queued commands in order. On failure the failed item goes back to the head.
    async fn flush(&mut self, session: &mut dyn Session) -> Result<usize, TransportError> {
        for expired in self.queue.take_expired(Instant::now()) {
            self.bus.publish(
                Event::new(EventKind::CommandEvicted)
                    .with_topic(expired.kind())
                    .with_reason("expired"),
            );
        }

        let mut sent = 0;
        while let Some(item) = self.queue.pop_front() {
            if let Err(err) = self.write(session, &item.envelope).await {
                self.queue.push_front(item);
                return Err(err);
            }
            sent += 1;
        }
        if sent > 0 {
            debug!(count = sent, "outbound queue flushed");
            self.bus
                .publish(Event::new(EventKind::QueueFlushed).with_count(sent));
        }
        Ok(sent)
    }
}

/// Resolves on the next tick, or never when there is no interval.
pub(crate) async fn next_tick(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(iv) => {
            iv.tick().await;
        }
        None => std::future::pending().await,
    }
}
