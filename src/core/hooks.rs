//! # Callback hooks.
//!
//! `on_state_change` and `on_error` are small listener tasks:
//!
//! ```text
//! StateCell ──► StateHooks (unbounded, per hook) ──► hook task ──► f(from, to)
//! Bus ─────────────────────────────────────────────► hook task ──► f(&Fault)
//!                         cancelled by HookHandle::remove() or supervisor exit
//! ```
//!
//! State hooks get every transition: each has its own unbounded queue, so
//! `bus_capacity` never drops one. Error hooks ride the lossy bus and skip
//! faults when they lag.
//!
//! Callbacks run on the hook task, never on the supervisor. A panicking callback
//! is logged and the hook keeps running.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::ConnectionState;
use crate::error::{Fault, panic_message};
use crate::events::Event;

/// Handle to a registered hook.
///
/// Dropping the handle leaves the hook running; call [`remove`](Self::remove)
/// to stop it.
#[derive(Debug)]
pub struct HookHandle {
    token: CancellationToken,
}

impl HookHandle {
    /// Stops the hook. Events published afterwards are not delivered.
    pub fn remove(self) {
        self.token.cancel();
    }

    /// True once the hook has been removed or the client has shut down.
    pub fn is_removed(&self) -> bool {
        self.token.is_cancelled()
    }
}

type Transition = (ConnectionState, ConnectionState);

/// Fan-out of state transitions to the registered state hooks.
#[derive(Clone, Default)]
pub(crate) struct StateHooks {
    senders: Arc<Mutex<Vec<mpsc::UnboundedSender<Transition>>>>,
}

impl StateHooks {
    fn register(&self) -> mpsc::UnboundedReceiver<Transition> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        rx
    }

    /// Queues the transition for every live hook and prunes removed ones.
    pub(crate) fn notify(&self, from: ConnectionState, to: ConnectionState) {
        self.senders.lock().retain(|tx| tx.send((from, to)).is_ok());
    }
}

pub(crate) fn spawn_state_hook<F>(
    hooks: &StateHooks,
    token: CancellationToken,
    f: F,
) -> HookHandle
where
    F: Fn(ConnectionState, ConnectionState) + Send + Sync + 'static,
{
    let handle = HookHandle {
        token: token.clone(),
    };
    let mut rx = hooks.register();

    tokio::spawn(async move {
        loop {
            let (from, to) = tokio::select! {
                biased;
                next = rx.recv() => match next {
                    Some(t) => t,
                    None => break,
                },
                () = token.cancelled() => break,
            };

            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| f(from, to))) {
                warn!(hook = "on_state_change", err = %panic_message(&*panic_err), "hook panicked");
            }
        }
    });

    handle
}

pub(crate) fn spawn_error_hook<F>(
    rx: broadcast::Receiver<Event>,
    token: CancellationToken,
    f: F,
) -> HookHandle
where
    F: Fn(&Fault) + Send + Sync + 'static,
{
    spawn_hook("on_error", rx, token, move |ev| {
        if let Some(fault) = &ev.fault {
            f(fault);
        }
    })
}

fn spawn_hook<F>(
    name: &'static str,
    mut rx: broadcast::Receiver<Event>,
    token: CancellationToken,
    f: F,
) -> HookHandle
where
    F: Fn(&Event) + Send + Sync + 'static,
{
    let handle = HookHandle {
        token: token.clone(),
    };

    tokio::spawn(async move {
        loop {
            let ev = tokio::select! {
                biased;
                res = rx.recv() => match res {
                    Ok(ev) => ev,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(hook = name, skipped, "hook lagged behind the event bus");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
                () = token.cancelled() => break,
            };

            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| f(&ev))) {
                warn!(hook = name, err = %panic_message(&*panic_err), "hook panicked");
            }
        }
    });

    handle
}
