//! Day streaks over completed sessions.
//!
//! Sessions are bucketed by the local calendar day they started on; several
//! sessions on one day count once.

use std::collections::BTreeSet;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};

use crate::history::CompletedSessionRecord;

/// Distinct calendar days (in `tz`) on which a session started.
pub fn active_days<Tz: TimeZone>(records: &[CompletedSessionRecord], tz: &Tz) -> BTreeSet<NaiveDate> {
    records
        .iter()
        .map(|r| day_of(r.start_time, tz))
        .collect()
}

pub fn day_of<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Consecutive active days ending at the most recent one, which must be
/// `today` or the day before; otherwise 0.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let Some(&latest) = days.iter().next_back() else {
        return 0;
    };
    let yesterday = today.checked_sub_days(Days::new(1));
    if latest != today && Some(latest) != yesterday {
        return 0;
    }

    let mut streak = 1;
    let mut expected = latest.checked_sub_days(Days::new(1));
    for &day in days.iter().rev().skip(1) {
        if Some(day) != expected {
            break;
        }
        streak += 1;
        expected = day.checked_sub_days(Days::new(1));
    }
    streak
}

/// Longest run of consecutive active days anywhere in the history.
pub fn best_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for &day in days {
        let continues = previous
            .and_then(|p| p.checked_add_days(Days::new(1)))
            .is_some_and(|next| next == day);
        run = if continues { run + 1 } else { 1 };
        best = best.max(run);
        previous = Some(day);
    }
    best
}
