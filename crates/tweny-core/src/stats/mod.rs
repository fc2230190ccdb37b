//! Statistics derived from session history.
//!
//! Everything here is recomputed from the full record list on every call;
//! nothing is cached.

mod badges;
mod streak;

use std::fmt;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use crate::history::CompletedSessionRecord;

pub use badges::{unlocked, Badge, Requirement, BADGES};
pub use streak::{active_days, best_streak, current_streak, day_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rank {
    Novice,
    FocusApprentice,
    DeepWorker,
    FlowMaster,
}

impl Rank {
    pub fn for_hours(hours: f64) -> Self {
        if hours < 10.0 {
            Rank::Novice
        } else if hours < 50.0 {
            Rank::FocusApprentice
        } else if hours < 100.0 {
            Rank::DeepWorker
        } else {
            Rank::FlowMaster
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Rank::Novice => "Novice",
            Rank::FocusApprentice => "Focus Apprentice",
            Rank::DeepWorker => "Deep Worker",
            Rank::FlowMaster => "Flow Master",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySummary {
    pub total_sessions: u64,
    pub total_focus_hours: f64,
    pub total_breaks: u64,
    pub current_streak: u32,
    pub best_streak: u32,
    pub rank: Rank,
    pub badges: Vec<&'static Badge>,
}

impl HistorySummary {
    /// Summary in the local time zone as of now.
    pub fn compute(records: &[CompletedSessionRecord]) -> Self {
        Self::compute_at(records, &Local, Utc::now())
    }

    pub fn compute_at<Tz: TimeZone>(
        records: &[CompletedSessionRecord],
        tz: &Tz,
        now: DateTime<Utc>,
    ) -> Self {
        let total_sessions = records.len() as u64;
        let total_secs: u64 = records.iter().map(|r| r.duration_secs()).sum();
        let total_focus_hours = total_secs as f64 / 3600.0;
        let total_breaks = records.iter().map(|r| u64::from(r.breaks_taken)).sum();

        let days = active_days(records, tz);
        let current = current_streak(&days, day_of(now, tz));

        Self {
            total_sessions,
            total_focus_hours,
            total_breaks,
            current_streak: current,
            best_streak: best_streak(&days),
            rank: Rank::for_hours(total_focus_hours),
            badges: unlocked(total_sessions, total_focus_hours, current),
        }
    }
}
