//! Reconnect policies.
//!
//! This module groups the knobs that control **whether** the supervisor tries again
//! and **how long** it waits between attempts.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization strategy to avoid reconnect storms
//! - [`AttemptLimit`]  when to give up and enter `ClosedTerminal`
//!
//! ## Quick wiring
//! ```text
//! ClientConfig { backoff: BackoffPolicy, max_attempts: AttemptLimit, .. }
//!      └─► core::supervisor uses:
//!           - max_attempts.allows(failed) to decide retry vs terminal
//!           - backoff.next(failed - 1) to arm the reconnect timer
//! ```

mod backoff;
mod jitter;
mod limit;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use limit::AttemptLimit;
