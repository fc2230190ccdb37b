//! SQLite-based session history and key-value storage.
//!
//! Provides persistent storage for:
//! - Completed sessions (append-only, queried newest first)
//! - Key-value store for application state (preset list)

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::data_dir;
use crate::error::DatabaseError;
use crate::history::{CompletedSessionRecord, HistoryStore};

/// Simple string key-value persistence.
pub trait KeyValueStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError>;
    fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError>;
}

/// SQLite database for session history and kv state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data dir>/tweny.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, DatabaseError> {
        let path = data_dir()?.join("tweny.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self, DatabaseError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id            TEXT PRIMARY KEY,
                start_time    TEXT NOT NULL,
                end_time      TEXT NOT NULL,
                duration_secs INTEGER NOT NULL,
                breaks_taken  INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_start_time ON sessions(start_time);",
        )?;
        Ok(())
    }

    pub fn session_count(&self) -> Result<u64, DatabaseError> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get::<_, u64>(0))?;
        Ok(count)
    }
}

impl KeyValueStore for Database {
    fn kv_get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

impl HistoryStore for Database {
    fn append(&self, record: &CompletedSessionRecord) -> Result<(), DatabaseError> {
        self.conn.execute(
            "INSERT INTO sessions (id, start_time, end_time, duration_secs, breaks_taken)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id.to_string(),
                record.start_time.to_rfc3339_opts(SecondsFormat::Nanos, true),
                record.end_time.to_rfc3339_opts(SecondsFormat::Nanos, true),
                record.duration_secs(),
                record.breaks_taken,
            ],
        )?;
        Ok(())
    }

    fn list_desc(&self) -> Result<Vec<CompletedSessionRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, start_time, end_time, breaks_taken
             FROM sessions
             ORDER BY start_time DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, start, end, breaks_taken) = row?;
            records.push(CompletedSessionRecord {
                id: Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?,
                start_time: parse_time(&start)?,
                end_time: parse_time(&end)?,
                breaks_taken,
            });
        }
        Ok(records)
    }

    fn delete_all(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM sessions", [])?)
    }
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(format!("bad timestamp '{raw}': {e}")))
}

fn corrupt(message: String) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: "sessions".into(),
        message,
    }
}
