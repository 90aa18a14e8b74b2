//! Summary record store backed by SQLite.
//!
//! A record is created with an empty summary when a URL is submitted and
//! filled in once summarization succeeds. Uses WAL mode so readers (`show`,
//! `list`) are not blocked by a worker writing a summary.

use std::path::Path;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, StoreError};

/// Current schema version.
const SCHEMA_VERSION: i32 = 1;

/// A submitted article and its summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: i64,
    pub url: String,
    /// Empty until summarization succeeds.
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl SummaryRecord {
    /// True while no summary has been written.
    pub fn is_pending(&self) -> bool {
        self.summary.is_empty()
    }
}

/// Summary record store.
pub struct SummaryStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SummaryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryStore").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Initialization
// ─────────────────────────────────────────────────────────────────────────────

impl SummaryStore {
    /// Open or create a store at the given path.
    ///
    /// Creates the parent directory and the schema if they don't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize(true)?;

        info!("Summary store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        store.initialize(false)?;
        debug!("In-memory summary store created");
        Ok(store)
    }

    fn initialize(&self, wal: bool) -> Result<()> {
        let conn = self.conn.lock();

        if wal {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);
        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS summaries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                summary TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_summaries_created_at
                ON summaries(created_at);
            "#,
        )?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;

        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

impl SummaryStore {
    /// Create a record for `url` with an empty summary.
    pub fn create_placeholder(&self, url: &str) -> Result<SummaryRecord> {
        let conn = self.conn.lock();
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO summaries (url, summary, created_at) VALUES (?1, '', ?2)",
            params![url, created_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();

        debug!("Created summary record {} for {}", id, url);
        Ok(SummaryRecord {
            id,
            url: url.to_string(),
            summary: String::new(),
            created_at,
        })
    }

    /// Get a record by ID.
    pub fn get(&self, id: i64) -> Result<Option<SummaryRecord>> {
        let conn = self.conn.lock();

        let mut stmt =
            conn.prepare("SELECT id, url, summary, created_at FROM summaries WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// List records, newest first.
    pub fn list(&self, limit: usize, offset: usize) -> Result<Vec<SummaryRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            r#"
            SELECT id, url, summary, created_at
            FROM summaries
            ORDER BY id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )?;
        let mut rows = stmt.query(params![limit as i64, offset as i64])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(Self::row_to_record(row)?);
        }
        Ok(records)
    }

    /// Total number of records.
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Overwrite the summary of a record.
    pub fn update_summary(&self, id: i64, summary: &str) -> Result<()> {
        let conn = self.conn.lock();

        let rows_affected = conn.execute(
            "UPDATE summaries SET summary = ?2 WHERE id = ?1",
            params![id, summary],
        )?;
        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Summary {}", id)));
        }

        debug!("Updated summary for record {}", id);
        Ok(())
    }

    /// Replace the URL and summary of a record, returning the updated record.
    pub fn update(&self, id: i64, url: &str, summary: &str) -> Result<SummaryRecord> {
        let conn = self.conn.lock();

        let rows_affected = conn.execute(
            "UPDATE summaries SET url = ?2, summary = ?3 WHERE id = ?1",
            params![id, url, summary],
        )?;
        if rows_affected == 0 {
            return Err(StoreError::NotFound(format!("Summary {}", id)));
        }

        let mut stmt =
            conn.prepare("SELECT id, url, summary, created_at FROM summaries WHERE id = ?1")?;
        let mut rows = stmt.query(params![id])?;
        let row = rows
            .next()?
            .ok_or_else(|| StoreError::NotFound(format!("Summary {}", id)))?;
        let record = Self::row_to_record(row)?;

        debug!("Updated record {}", id);
        Ok(record)
    }

    /// Delete a record by ID. Returns false if it did not exist.
    pub fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute("DELETE FROM summaries WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    fn row_to_record(row: &Row<'_>) -> Result<SummaryRecord> {
        let created_at: String = row.get(3)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::InvalidData(format!("created_at '{}': {}", created_at, e)))?
            .with_timezone(&Utc);

        Ok(SummaryRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            summary: row.get(2)?,
            created_at,
        })
    }
}
