//! Completed-session log.
//!
//! Records are written exactly once, when a session stops, and never updated.
//! The only destructive operation is a full reset.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSessionRecord {
    pub id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub breaks_taken: u32,
}

impl CompletedSessionRecord {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>, breaks_taken: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            breaks_taken,
        }
    }

    /// `end_time - start_time`, floored at zero.
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time).max(Duration::zero())
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration().num_seconds().max(0) as u64
    }
}

/// Append-only store of completed sessions.
pub trait HistoryStore: Send {
    fn append(&self, record: &CompletedSessionRecord) -> Result<(), DatabaseError>;

    /// All records, most recent `start_time` first.
    fn list_desc(&self) -> Result<Vec<CompletedSessionRecord>, DatabaseError>;

    /// Delete every record. Returns how many were removed.
    fn delete_all(&self) -> Result<usize, DatabaseError>;
}
