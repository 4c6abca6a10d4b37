// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every job-lifecycle transition,
// filter/backend failure, and device announcement (§4/§6).
//
// Schema:
//   audit_log(
//     id        INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp TEXT    NOT NULL,   -- RFC 3339
//     action    TEXT    NOT NULL,   -- e.g. "job-created", "filter-failed"
//     subject   TEXT    NOT NULL,   -- job id, printer name, or device id
//     success   INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     detail    TEXT                -- optional free-form context
//   )

use std::path::Path;

use chrono::Utc;
use pressline_core::PresslineError;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Local error helpers
// ---------------------------------------------------------------------------

/// Convert a `rusqlite::Error` into a `PresslineError::Database`.
fn db_err(e: rusqlite::Error) -> PresslineError {
    PresslineError::Database(e.to_string())
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub subject: String,
    pub success: bool,
    pub detail: Option<String>,
}

/// Append-only audit log backed by a SQLite database.
///
/// Every job-lifecycle transition (`job-created`, `job-completed`,
/// `job-aborted`), filter/backend failure (`filter-failed`), and device
/// announcement (`device-announced`, `printer-registered`,
/// `printer-deregistered`) is recorded with a timestamp, an action name, the
/// subject it concerns (a job id, printer name, or device id), and a
/// success/failure flag.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`.
    ///
    /// The `audit_log` table is created automatically if it does not already
    /// exist. WAL mode is enabled for better concurrent-read performance.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PresslineError> {
        let conn = Connection::open(path).map_err(db_err)?;

        conn.execute_batch("PRAGMA journal_mode = WAL;")
            .map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT    NOT NULL,
                action    TEXT    NOT NULL,
                subject   TEXT    NOT NULL,
                success   INTEGER NOT NULL,
                detail    TEXT
            );",
        )
        .map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, PresslineError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT    NOT NULL,
                action    TEXT    NOT NULL,
                subject   TEXT    NOT NULL,
                success   INTEGER NOT NULL,
                detail    TEXT
            );",
        )
        .map_err(db_err)?;

        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Record a new audit entry.
    ///
    /// `action` is a short verb-phrase describing the event (e.g.
    /// `"job-created"`, `"filter-failed"`, `"device-announced"`). `subject`
    /// names the job id, printer name, or device id the entry concerns.
    #[instrument(skip(self, detail), fields(%action, %subject, success))]
    pub fn record(
        &self,
        action: &str,
        subject: &str,
        success: bool,
        detail: Option<&str>,
    ) -> Result<(), PresslineError> {
        let timestamp = Utc::now().to_rfc3339();
        let success_int: i32 = if success { 1 } else { 0 };

        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, action, subject, success, detail)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![timestamp, action, subject, success_int, detail],
            )
            .map_err(db_err)?;

        debug!("audit entry recorded");
        Ok(())
    }

    /// Retrieve all entries for a given subject, ordered by timestamp
    /// ascending.
    pub fn entries_for_subject(&self, subject: &str) -> Result<Vec<AuditEntry>, PresslineError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, subject, success, detail
                 FROM audit_log
                 WHERE subject = ?1
                 ORDER BY timestamp ASC",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![subject], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    subject: row.get(3)?,
                    success: row.get::<_, i32>(4)? != 0,
                    detail: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Retrieve the most recent `limit` entries, ordered newest-first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, PresslineError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, action, subject, success, detail
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map(params![limit], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    action: row.get(2)?,
                    subject: row.get(3)?,
                    success: row.get::<_, i32>(4)? != 0,
                    detail: row.get(5)?,
                })
            })
            .map_err(db_err)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(db_err)?);
        }
        Ok(entries)
    }

    /// Return the total number of entries in the audit log.
    pub fn count(&self) -> Result<u64, PresslineError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }
}
