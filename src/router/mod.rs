//! # Message router.
//!
//! Decodes inbound frames, dispatches them to subscribers by type, and encodes
//! outbound commands.
//!
//! ```text
//!  Session::recv() ─► Frame ─► Router::decode ─► Envelope ─► Router::dispatch
//!                                    │                            │
//!                           DecodeError (reported)      snapshot callbacks for type
//!                                                       release lock
//!                                                       call each, catch panics
//!                                                           └─► SubscriberPanicked
//! ```
//!
//! The router is shared (`Arc`) between the client handle (subscribe/unsubscribe)
//! and the supervisor actor (decode/dispatch/encode). It never touches the session.

mod codec;
mod envelope;
mod subscriptions;

pub use codec::{Codec, PayloadLayout};
pub use envelope::Envelope;
pub use subscriptions::{Handler, SubscriptionHandle, Subscriptions};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{trace, warn};

use crate::error::{ClientError, DecodeError, Fault, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::transport::Frame;

/// Decode/dispatch/encode hub for one client.
pub struct Router {
    codec: Codec,
    subs: Mutex<Subscriptions>,
    bus: Bus,
}

impl Router {
    pub fn new(codec: Codec, bus: Bus) -> Self {
        Self {
            codec,
            subs: Mutex::new(Subscriptions::new()),
            bus,
        }
    }

    /// Registers `handler` for events of type `kind`.
    pub fn subscribe(&self, kind: &str, handler: Handler) -> Result<SubscriptionHandle, ClientError> {
        if kind.trim().is_empty() {
            return Err(ClientError::EmptyType);
        }
        Ok(self.subs.lock().insert(kind, handler))
    }

    /// Removes a subscription. Safe to call from inside a callback.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.subs.lock().remove(handle)
    }

    /// Number of live subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.subs.lock().count(kind)
    }

    pub fn encode(&self, env: &Envelope) -> Frame {
        Frame::Text(self.codec.encode(env))
    }

    pub fn decode(&self, frame: &Frame) -> Result<Envelope, DecodeError> {
        self.codec.decode(frame)
    }

    /// Invokes every callback registered for `env.kind()` at call time, in
    /// registration order. Returns the number invoked.
    ///
    /// A panicking callback does not stop the ones after it.
    pub fn dispatch(&self, env: &Envelope) -> usize {
        let handlers = self.subs.lock().snapshot(env.kind());
        trace!(kind = env.kind(), subscribers = handlers.len(), "dispatch");

        for handler in &handlers {
            if let Err(panic_err) = catch_unwind(AssertUnwindSafe(|| handler(env))) {
                let info = panic_message(&*panic_err);
                warn!(kind = env.kind(), err = %info, "subscriber panicked");
                self.bus.publish(
                    Event::new(EventKind::SubscriberPanicked)
                        .with_topic(env.kind())
                        .with_fault(Fault::Subscriber {
                            topic: env.kind().into(),
                            info: info.into(),
                        }),
                );
            }
        }
        handlers.len()
    }
}
