//! # Connection state machine.
//!
//! [`ConnectionState`] is owned by the supervisor; nothing else can set it.
//! Every change goes through [`ConnectionState::can_transition_to`].
//!
//! ```text
//!   Idle ──start()──► Connecting ──opened──► Open
//!                       │    ▲                │
//!        failed/timeout │    │ timer elapsed  │ dropped
//!                       ▼    │                ▼
//!                     ClosedRetrying ◄────────┘
//!                       │
//!                       └─ limit reached ─► ClosedTerminal ──start()──► Connecting
//!
//!   stop() from Connecting / Open / ClosedRetrying ─► Closing ─► Idle
//!   fatal decode error in Open ─► Closing ─► ClosedRetrying
//!   every handle dropped ─► Closing ─► ClosedTerminal
//! ```
//!
//! Edges:
//! - `Idle → Connecting`, `ClosedTerminal → Connecting` on `start()`
//! - `Connecting → Open | ClosedRetrying | Closing`
//! - `Open → Closing | ClosedRetrying`
//! - `ClosedRetrying → Connecting | ClosedTerminal | Closing`
//! - `Closing → Idle | ClosedRetrying | ClosedTerminal`

use std::fmt;

/// Lifecycle state of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not started, or stopped by the caller. Restartable.
    #[default]
    Idle,
    /// A transport session is being opened.
    Connecting,
    /// A transport session is live; commands are sent immediately.
    Open,
    /// The current session (if any) is being shut down.
    Closing,
    /// The last session failed; a reconnect timer is armed.
    ClosedRetrying,
    /// The reconnect policy is exhausted. Requires an explicit `start()`.
    ClosedTerminal,
}

impl ConnectionState {
    /// Returns `true` if the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;

        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, ClosedRetrying)
                | (Connecting, Closing)
                | (Open, Closing)
                | (Open, ClosedRetrying)
                | (ClosedRetrying, Connecting)
                | (ClosedRetrying, ClosedTerminal)
                | (ClosedRetrying, Closing)
                | (Closing, Idle)
                | (Closing, ClosedRetrying)
                | (Closing, ClosedTerminal)
                | (ClosedTerminal, Connecting)
        )
    }

    /// Returns `true` if `start()` is a no-op in this state.
    #[inline]
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Open | ConnectionState::ClosedRetrying
        )
    }

    /// Returns `true` if the state is `Open`.
    #[inline]
    pub fn is_open(self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::ClosedRetrying => "closed_retrying",
            ConnectionState::ClosedTerminal => "closed_terminal",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionState::{self, *};

    const ALL: [ConnectionState; 6] = [
        Idle,
        Connecting,
        Open,
        Closing,
        ClosedRetrying,
        ClosedTerminal,
    ];

    #[test]
    fn happy_path_edges_exist() {
        assert!(Idle.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Open));
        assert!(Open.can_transition_to(Closing));
        assert!(Closing.can_transition_to(Idle));
    }

    #[test]
    fn retry_path_edges_exist() {
        assert!(Connecting.can_transition_to(ClosedRetrying));
        assert!(Open.can_transition_to(ClosedRetrying));
        assert!(ClosedRetrying.can_transition_to(Connecting));
        assert!(ClosedRetrying.can_transition_to(ClosedTerminal));
        assert!(ClosedTerminal.can_transition_to(Connecting));
    }

    #[test]
    fn shortcuts_are_rejected() {
        assert!(!Idle.can_transition_to(Open));
        assert!(!Connecting.can_transition_to(Idle));
        assert!(!Open.can_transition_to(Connecting));
        assert!(!Open.can_transition_to(Idle));
        assert!(!ClosedTerminal.can_transition_to(Open));
        assert!(!ClosedTerminal.can_transition_to(Idle));
    }

    #[test]
    fn no_self_loops() {
        for s in ALL {
            assert!(!s.can_transition_to(s), "{s} → {s}");
        }
    }

    #[test]
    fn every_state_is_reachable_and_leavable() {
        for s in ALL {
            assert!(ALL.iter().any(|from| from.can_transition_to(s)), "{s} unreachable");
            assert!(ALL.iter().any(|to| s.can_transition_to(*to)), "{s} is a sink");
        }
    }
}
