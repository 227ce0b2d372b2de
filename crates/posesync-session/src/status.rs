//! Session status and its transition function.
//!
//! ```text
//!            connect()             Connected
//!   Idle ───────────────→ Connecting ─────────→ Connected
//!    ↑                        │                    │
//!    │                        │ ClosedByPeer /     │
//!    │        teardown        ▼ disconnect()       ▼
//!    └─────────────────── Disconnecting ←──────────┘
//!    ↑
//!    │ disconnect()     ProblemDetectedLocally
//!  Failed ←──────────── (Connecting | Connected)
//! ```
//!
//! Transport events never mutate the status directly. They go through
//! [`SessionStatus::on_transport`], which returns the next status plus the
//! side effect the client has to perform.

use std::fmt;

use posesync_transport::ConnectionStatus;

/// Lifecycle of the single server session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionStatus {
    /// No connection and no resources held.
    #[default]
    Idle,
    /// Connect request issued, waiting for the transport.
    Connecting,
    /// Connected; the sync task is running.
    Connected,
    /// Tearing down. Only visible while teardown is in progress.
    Disconnecting,
    /// The last attempt failed on our side. Resources are already released;
    /// `disconnect()` acknowledges the failure and returns to `Idle`.
    Failed,
}

impl SessionStatus {
    /// `true` while a transport binding is held.
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::Connected)
    }

    /// Applies a transport status event.
    pub fn on_transport(self, event: ConnectionStatus) -> Transition {
        use ConnectionStatus as Event;
        use SessionStatus::*;

        match (self, event) {
            (Connecting, Event::Connected) => Transition {
                next: Connected,
                action: Action::StartSync,
            },
            (Connecting | Connected, Event::ClosedByPeer) => Transition {
                next: Disconnecting,
                action: Action::Teardown,
            },
            (Connecting | Connected, Event::ProblemDetectedLocally) => {
                Transition {
                    next: Failed,
                    action: Action::Teardown,
                }
            }
            // `None`, duplicates, and anything arriving after teardown.
            (current, _) => Transition::stay(current),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Disconnecting => "disconnecting",
            SessionStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    None,
    /// Start the sync task and send the presentation payload.
    StartSync,
    /// Stop the sync task, close the transport, clear the roster.
    Teardown,
}

/// Result of [`SessionStatus::on_transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionStatus,
    pub action: Action,
}

impl Transition {
    fn stay(current: SessionStatus) -> Self {
        Self {
            next: current,
            action: Action::None,
        }
    }
}
