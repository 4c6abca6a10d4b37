// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Durable job queue backed by SQLite in WAL mode (§4.4): the job set survives
// a scheduler restart so an in-flight job is recovered, not silently lost.
// Document bytes are not persisted here, only metadata and the JSON options
// blob; a document's bytes are handed to the filter chain as they arrive.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::{debug, info, instrument};

use pressline_core::{ContentType, Job, JobDocument, JobId, JobState, PresslineError, Result};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id INTEGER PRIMARY KEY,
        printer_ref INTEGER NOT NULL,
        printer_name TEXT NOT NULL,
        originating_user TEXT NOT NULL,
        title TEXT NOT NULL,
        document_format TEXT,
        documents TEXT NOT NULL,
        state TEXT NOT NULL,
        options TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        abort_reason TEXT
    )
"#;

/// Persistent job queue. All methods are synchronous, matching `rusqlite`'s
/// blocking API; a caller on an async runtime wraps calls in
/// `spawn_blocking`.
pub struct JobQueue {
    conn: Connection,
}

impl JobQueue {
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| PresslineError::Database(format!("open: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| PresslineError::Database(format!("WAL pragma: {e}")))?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| PresslineError::Database(format!("create table: {e}")))?;
        info!("job queue database opened");
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PresslineError::Database(format!("open in-memory: {e}")))?;
        conn.execute_batch(CREATE_TABLE_SQL)
            .map_err(|e| PresslineError::Database(format!("create table: {e}")))?;
        debug!("in-memory job queue database opened");
        Ok(Self { conn })
    }

    #[instrument(skip(self, job), fields(job_id = job.id.0))]
    pub fn insert_job(&self, job: &Job) -> Result<()> {
        let documents_json = serde_json::to_string(&job.documents)?;
        let state_json = serde_json::to_string(&job.state)?;
        let document_format = job.document_format.as_ref().map(|f| f.to_string());
        self.conn
            .execute(
                "INSERT INTO jobs (id, printer_ref, printer_name, originating_user, title,
                 document_format, documents, state, options, created_at, updated_at, abort_reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    job.id.0,
                    job.printer_ref.0 as i64,
                    job.printer_name,
                    job.originating_user,
                    job.title,
                    document_format,
                    documents_json,
                    state_json,
                    job.options.to_string(),
                    job.created_at.to_rfc3339(),
                    job.updated_at.to_rfc3339(),
                    job.abort_reason,
                ],
            )
            .map_err(|e| PresslineError::Database(format!("insert job: {e}")))?;
        info!(job_id = job.id.0, "job inserted into queue");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn update_job(&self, job: &Job) -> Result<()> {
        let documents_json = serde_json::to_string(&job.documents)?;
        let state_json = serde_json::to_string(&job.state)?;
        let document_format = job.document_format.as_ref().map(|f| f.to_string());
        let rows = self
            .conn
            .execute(
                "UPDATE jobs SET document_format = ?1, documents = ?2, state = ?3,
                 options = ?4, updated_at = ?5, abort_reason = ?6 WHERE id = ?7",
                params![
                    document_format,
                    documents_json,
                    state_json,
                    job.options.to_string(),
                    job.updated_at.to_rfc3339(),
                    job.abort_reason,
                    job.id.0,
                ],
            )
            .map_err(|e| PresslineError::Database(format!("update job: {e}")))?;
        if rows == 0 {
            return Err(PresslineError::JobNotFound(job.id.0));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, printer_ref, printer_name, originating_user, title,
                        document_format, documents, state, options, created_at,
                        updated_at, abort_reason FROM jobs WHERE id = ?1",
            )
            .map_err(|e| PresslineError::Database(format!("prepare get_job: {e}")))?;
        let mut rows = stmt
            .query_map(params![job_id.0], row_to_job)
            .map_err(|e| PresslineError::Database(format!("query get_job: {e}")))?;
        match rows.next() {
            Some(Ok(job)) => Ok(Some(job)),
            Some(Err(e)) => Err(PresslineError::Database(format!("row parse: {e}"))),
            None => Ok(None),
        }
    }

    /// All jobs that are not yet in a terminal state, ordered by id — the
    /// recovery set a scheduler restart re-admits to its queue.
    #[instrument(skip(self))]
    pub fn get_active_jobs(&self) -> Result<Vec<Job>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, printer_ref, printer_name, originating_user, title,
                        document_format, documents, state, options, created_at,
                        updated_at, abort_reason FROM jobs ORDER BY id ASC",
            )
            .map_err(|e| PresslineError::Database(format!("prepare get_active_jobs: {e}")))?;
        let jobs = stmt
            .query_map([], row_to_job)
            .map_err(|e| PresslineError::Database(format!("query get_active_jobs: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PresslineError::Database(format!("collect rows: {e}")))?;
        let active: Vec<Job> = jobs.into_iter().filter(|j| !j.state.is_terminal()).collect();
        debug!(count = active.len(), "recovered active jobs");
        Ok(active)
    }

    #[instrument(skip(self))]
    pub fn get_jobs_for_printer(&self, printer_name: &str) -> Result<Vec<Job>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, printer_ref, printer_name, originating_user, title,
                        document_format, documents, state, options, created_at,
                        updated_at, abort_reason FROM jobs WHERE printer_name = ?1 ORDER BY id ASC",
            )
            .map_err(|e| PresslineError::Database(format!("prepare get_jobs_for_printer: {e}")))?;
        let jobs = stmt
            .query_map(params![printer_name], row_to_job)
            .map_err(|e| PresslineError::Database(format!("query get_jobs_for_printer: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PresslineError::Database(format!("collect rows: {e}")))?;
        Ok(jobs)
    }
}

fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Job> {
    let id: i32 = row.get(0)?;
    let printer_ref: i64 = row.get(1)?;
    let printer_name: String = row.get(2)?;
    let originating_user: String = row.get(3)?;
    let title: String = row.get(4)?;
    let document_format: Option<String> = row.get(5)?;
    let documents_json: String = row.get(6)?;
    let state_json: String = row.get(7)?;
    let options_json: String = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;
    let abort_reason: Option<String> = row.get(11)?;

    let documents: Vec<JobDocument> = serde_json::from_str(&documents_json).unwrap_or_default();
    let state: JobState = serde_json::from_str(&state_json).unwrap_or(JobState::Aborted);
    let options: serde_json::Value =
        serde_json::from_str(&options_json).unwrap_or(serde_json::Value::Null);
    let created_at: DateTime<Utc> = created_at.parse().unwrap_or_else(|_| Utc::now());
    let updated_at: DateTime<Utc> = updated_at.parse().unwrap_or_else(|_| Utc::now());
    let document_format = document_format.and_then(|f| ContentType::parse(&f));

    Ok(Job {
        id: JobId(id),
        printer_ref: pressline_core::PrinterRef(printer_ref as usize),
        printer_name,
        originating_user,
        title,
        document_format,
        documents,
        state,
        options,
        created_at,
        updated_at,
        abort_reason,
    })
}
