//! # Client: the public handle.
//!
//! [`Client`] is a cheap, cloneable handle to one supervised connection. Every
//! method returns immediately; work happens on the supervisor task.
//!
//! ```text
//!   Client::builder(cfg)
//!       .with_transport(..)          (default: WsTransport)
//!       .with_observers(vec![..])
//!       .build()?
//!          │
//!          ├─ spawn Supervisor::run()      (mailbox ◄── start/stop/send)
//!          ├─ spawn observer listener      (Bus ──► ObserverSet)
//!          └─ Client { mailbox tx, router, bus, state watch, state hooks }
//! ```
//!
//! Dropping the last `Client` closes the session and stops the supervisor.
//!
//! ## Example
//! ```no_run
//! use sockvisor::{Client, ClientConfig, Envelope};
//!
//! # async fn demo() -> Result<(), sockvisor::ClientError> {
//! let client = Client::builder(ClientConfig::new("ws://127.0.0.1:8000/ws/chat/")).build()?;
//!
//! client.subscribe("metrics_update", |env: &Envelope| {
//!     println!("update: {}", env.payload());
//! })?;
//! client.start()?;
//! client.send("request_metrics", &serde_json::json!({"category": "all"}))?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::core::config::{ClientConfig, Endpoint};
use crate::core::hooks::{self, HookHandle, StateHooks};
use crate::core::supervisor::{Control, Supervisor};
use crate::core::ConnectionState;
use crate::error::{ClientError, Fault};
use crate::events::{Bus, Event};
use crate::observers::{Observer, ObserverSet};
use crate::router::{Envelope, Router, SubscriptionHandle};
use crate::transport::{Transport, WsTransport};

/// Builder for [`Client`].
pub struct ClientBuilder {
    cfg: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    observers: Vec<Arc<dyn Observer>>,
}

impl ClientBuilder {
    pub fn new(cfg: ClientConfig) -> Self {
        Self {
            cfg,
            transport: None,
            observers: Vec::new(),
        }
    }

    /// Replaces the default WebSocket transport.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets lifecycle observers.
    ///
    /// Each observer gets its own bounded queue and worker task.
    pub fn with_observers(mut self, observers: Vec<Arc<dyn Observer>>) -> Self {
        self.observers = observers;
        self
    }

    /// Validates the config and spawns the supervisor.
    ///
    /// Must be called from within a Tokio runtime. The connection stays `Idle`
    /// until [`Client::start`].
    pub fn build(self) -> Result<Client, ClientError> {
        let endpoint = self.cfg.endpoint()?;
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let router = Arc::new(Router::new(self.cfg.codec(), bus.clone()));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(WsTransport) as Arc<dyn Transport>);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let (tx, mailbox) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let state_hooks = StateHooks::default();

        let observers = ObserverSet::new(self.observers, bus.clone());
        spawn_observer_listener(bus.subscribe(), observers, shutdown.clone());

        let supervisor = Supervisor::new(
            self.cfg,
            endpoint.url().clone(),
            transport,
            Arc::clone(&router),
            bus.clone(),
            state_tx,
            state_hooks.clone(),
            mailbox,
        );
        let done = shutdown.clone();
        tokio::spawn(async move {
            supervisor.run().await;
            done.cancel();
        });

        Ok(Client {
            inner: Arc::new(Inner {
                tx,
                router,
                bus,
                state_rx,
                state_hooks,
                endpoint,
                shutdown,
            }),
        })
    }
}

struct Inner {
    tx: mpsc::UnboundedSender<Control>,
    router: Arc<Router>,
    bus: Bus,
    state_rx: watch::Receiver<ConnectionState>,
    state_hooks: StateHooks,
    endpoint: Endpoint,
    shutdown: CancellationToken,
}

/// Handle to one supervised connection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

impl Client {
    /// Starts building a client.
    pub fn builder(cfg: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(cfg)
    }

    /// Begins connecting. No-op while `Connecting`, `Open` or `ClosedRetrying`.
    ///
    /// From `ClosedTerminal` this resets the attempt counter and retries.
    pub fn start(&self) -> Result<(), ClientError> {
        self.control(Control::Start)
    }

    /// Closes the connection and cancels any pending attempt or timer.
    /// The connection ends `Idle` and can be started again.
    pub fn stop(&self) -> Result<(), ClientError> {
        self.control(Control::Stop)
    }

    /// Sends a command, or queues it until the next `Open`.
    ///
    /// Validation errors are returned synchronously; delivery is not confirmed.
    pub fn send<T: Serialize + ?Sized>(&self, kind: &str, payload: &T) -> Result<(), ClientError> {
        self.send_envelope(Envelope::from_serialize(kind, payload)?)
    }

    /// Sends a prebuilt envelope.
    pub fn send_envelope(&self, env: Envelope) -> Result<(), ClientError> {
        self.control(Control::Send(env))
    }

    /// Registers a callback for inbound events of type `kind`.
    ///
    /// Callbacks run on the supervisor task, in registration order; keep them short.
    pub fn subscribe<F>(&self, kind: &str, f: F) -> Result<SubscriptionHandle, ClientError>
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        self.inner.router.subscribe(kind, Arc::new(f))
    }

    /// Removes a subscription. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.inner.router.unsubscribe(handle)
    }

    /// Calls `f(from, to)` on every state transition, in order.
    ///
    /// Transitions are queued per hook without a bound, so a slow hook never
    /// misses one.
    pub fn on_state_change<F>(&self, f: F) -> HookHandle
    where
        F: Fn(ConnectionState, ConnectionState) + Send + Sync + 'static,
    {
        hooks::spawn_state_hook(&self.inner.state_hooks, self.hook_token(), f)
    }

    /// Calls `f(&fault)` for every absorbed fault.
    ///
    /// Faults come off the lifecycle bus; a hook lagging more than
    /// `bus_capacity` events behind skips the oldest.
    pub fn on_error<F>(&self, f: F) -> HookHandle
    where
        F: Fn(&Fault) + Send + Sync + 'static,
    {
        hooks::spawn_error_hook(self.inner.bus.subscribe(), self.hook_token(), f)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state_rx.borrow()
    }

    /// Watch channel of the connection state.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_rx.clone()
    }

    /// Raw lifecycle event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.inner.endpoint
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.inner.router.subscriber_count(kind)
    }

    fn control(&self, msg: Control) -> Result<(), ClientError> {
        self.inner.tx.send(msg).map_err(|_| ClientError::Closed)
    }

    fn hook_token(&self) -> CancellationToken {
        self.inner.shutdown.child_token()
    }
}

/// Forwards bus events to the observer set until the supervisor exits.
fn spawn_observer_listener(
    mut rx: broadcast::Receiver<Event>,
    set: ObserverSet,
    shutdown: CancellationToken,
) {
    if set.is_empty() {
        return;
    }
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "observer listener lagged behind the event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                () = shutdown.cancelled() => break,
            }
        }
        set.shutdown().await;
    });
}
