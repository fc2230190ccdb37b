use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::history::CompletedSessionRecord;
use crate::timer::{SessionSnapshot, TimerPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stopped by the user (any surface: app, companion, deep link).
    User,
    /// `session_elapsed` reached the session goal.
    GoalReached,
    /// A new session was started over a live one.
    Replaced,
}

/// Every state change in the engine produces an Event.
/// Subscribers (UI, live activity, companion channel) consume them from the
/// controller's broadcast channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    /// Countdown advanced within the current phase.
    SnapshotChanged {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    PhaseChanged {
        from: TimerPhase,
        to: TimerPhase,
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    SessionPaused {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    SessionResumed {
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    SessionStopped {
        reason: StopReason,
        record: Option<CompletedSessionRecord>,
        /// Live state just before the reset, as last displayed.
        last: SessionSnapshot,
        /// Idle state after the reset.
        snapshot: SessionSnapshot,
        at: DateTime<Utc>,
    },
    /// The completed-session record could not be persisted.
    HistoryWriteFailed {
        message: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// The snapshot to push to display surfaces after this event, if any.
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        match self {
            Event::SessionStarted { snapshot, .. }
            | Event::SnapshotChanged { snapshot, .. }
            | Event::PhaseChanged { snapshot, .. }
            | Event::SessionPaused { snapshot, .. }
            | Event::SessionResumed { snapshot, .. }
            | Event::SessionStopped { snapshot, .. } => Some(snapshot),
            Event::HistoryWriteFailed { .. } => None,
        }
    }
}
