//! Local reminder scheduling.

use serde::{Deserialize, Serialize};

pub const REMINDER_SOUND: &str = "ping.aiff";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub title: String,
    pub body: String,
    /// Delay from scheduling until the reminder fires.
    pub after_secs: u64,
    pub sound: Option<String>,
}

impl Reminder {
    /// Fires when the current work interval runs out.
    pub fn break_due(after_secs: u64) -> Self {
        Self {
            title: "Time for a break!".into(),
            body: "Look away for 20 seconds.".into(),
            after_secs,
            sound: Some(REMINDER_SOUND.into()),
        }
    }

    /// Fires when the current break runs out.
    pub fn break_over(after_secs: u64) -> Self {
        Self {
            title: "Break Over!".into(),
            body: "Time to focus again.".into(),
            after_secs,
            sound: Some(REMINDER_SOUND.into()),
        }
    }

    pub fn goal_reached() -> Self {
        Self {
            title: "Goal Reached!".into(),
            body: "You've completed your session goal.".into(),
            after_secs: 1,
            sound: None,
        }
    }
}

/// Platform reminder scheduler.
pub trait Notifier: Send + Sync {
    fn schedule(&self, reminder: Reminder);

    /// Drop every pending reminder.
    fn cancel_all(&self);
}

/// Writes reminders to the log instead of the OS.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn schedule(&self, reminder: Reminder) {
        tracing::info!(
            title = %reminder.title,
            body = %reminder.body,
            after_secs = reminder.after_secs,
            "reminder scheduled"
        );
    }

    fn cancel_all(&self) {
        tracing::debug!("pending reminders cancelled");
    }
}
