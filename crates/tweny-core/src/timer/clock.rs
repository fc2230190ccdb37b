//! Time sources and interval pacing.
//!
//! The engine never reads the system time directly. Production code hands it
//! a [`SystemClock`]; tests hand it a [`ManualClock`] and advance it by hand.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wall-clock source used for timestamps (session start/end, phase target).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance(Duration::seconds(secs));
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut guard = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `at + secs`, or `None` when that is not a representable instant.
pub(crate) fn offset_secs(at: DateTime<Utc>, secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    at.checked_add_signed(Duration::try_seconds(secs)?)
}

/// How configured interval lengths map onto the lengths actually run.
///
/// `Accelerated` is the debug mode: every work and break phase is replaced
/// by a short fixed length so a full cycle can be watched in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Pace {
    #[default]
    RealTime,
    Accelerated { work_secs: u64, break_secs: u64 },
}

impl Pace {
    pub fn work_secs(&self, configured: u64) -> u64 {
        match self {
            Pace::RealTime => configured,
            Pace::Accelerated { work_secs, .. } => *work_secs,
        }
    }

    /// `None` means "use the configured break policy".
    pub fn break_override(&self) -> Option<u64> {
        match self {
            Pace::RealTime => None,
            Pace::Accelerated { break_secs, .. } => Some(*break_secs),
        }
    }
}
