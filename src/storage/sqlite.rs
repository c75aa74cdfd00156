//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ProgressStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use crate::storage::{ProgressRecord, ProgressStatus};
use crate::CrawlerError;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite progress store
///
/// The connection sits behind a mutex so the store can be shared by all crawlers.
pub struct SqliteProgressStore {
    conn: Mutex<Connection>,
}

impl SqliteProgressStore {
    /// Opens or creates the database file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteProgressStore)` - Successfully opened/created database
    /// * `Err(CrawlerError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, CrawlerError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database, mostly useful for tests and dry runs
    pub fn new_in_memory() -> Result<Self, CrawlerError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Database("progress store lock poisoned".to_string()))
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<(String, String, String, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_record(raw: (String, String, String, String)) -> StorageResult<ProgressRecord> {
    let (domain_id, url, status, updated_at) = raw;
    let status =
        ProgressStatus::from_db_string(&status).ok_or(StorageError::UnknownStatus(status))?;
    Ok(ProgressRecord {
        domain_id,
        url,
        status,
        updated_at,
    })
}

impl ProgressStore for SqliteProgressStore {
    fn set_status(&self, domain_id: &str, url: &str, status: ProgressStatus) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO progress (domain_id, url, status, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(domain_id, url) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
            params![domain_id, url, status.to_db_string(), now()],
        )?;
        Ok(())
    }

    fn clear_status(&self, domain_id: &str, url: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM progress WHERE domain_id = ?1 AND url = ?2",
            params![domain_id, url],
        )?;
        Ok(())
    }

    fn get_status(&self, domain_id: &str, url: &str) -> StorageResult<Option<ProgressStatus>> {
        let conn = self.lock()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM progress WHERE domain_id = ?1 AND url = ?2",
                params![domain_id, url],
                |row| row.get(0),
            )
            .optional()?;

        match status {
            Some(s) => ProgressStatus::from_db_string(&s)
                .map(Some)
                .ok_or(StorageError::UnknownStatus(s)),
            None => Ok(None),
        }
    }

    fn entries(&self, domain_id: &str) -> StorageResult<Vec<ProgressRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT domain_id, url, status, updated_at FROM progress
             WHERE domain_id = ?1 ORDER BY updated_at DESC, rowid DESC",
        )?;

        let rows = stmt
            .query_map(params![domain_id], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_record).collect()
    }

    fn all_entries(&self) -> StorageResult<Vec<ProgressRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT domain_id, url, status, updated_at FROM progress
             ORDER BY domain_id, updated_at DESC",
        )?;

        let rows = stmt
            .query_map([], record_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(into_record).collect()
    }

    fn clear_domain(&self, domain_id: &str) -> StorageResult<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM progress WHERE domain_id = ?1",
            params![domain_id],
        )?;
        Ok(removed)
    }
}
