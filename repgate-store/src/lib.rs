//! Persistent per-host reputation store.
//!
//! Maps a host identity (textual, unique) to a bounded penalty counter in
//! seconds. Absence of a record means penalty 0; a stored penalty is always
//! in [1, 60]. Multiple gate instances (one per concurrent connection) share
//! the store through SQLite's file-level locking: every mutation is a single
//! atomic statement, so concurrent writers serialize without lost updates.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, OpenFlags};
use thiserror::Error;

/// Hard cap on a stored penalty, in seconds.
pub const MAX_PENALTY_SECS: u32 = 60;

/// How long a writer waits for the database lock before giving up.
///
/// Under normal contention a writer blocks here rather than failing
/// outright; only a wedged peer holds the lock longer than this.
pub const BUSY_TIMEOUT_MS: u64 = 5_000;

/// Errors from reputation store operations.
///
/// Every variant is fatal to the calling gate instance: the store is never
/// retried and no partial-state recovery is attempted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open reputation store {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("reputation store statement failed: {0}")]
    Statement(#[from] rusqlite::Error),
}

/// Handle to the host reputation database.
///
/// Opened either read-only (penalty lookup) or read-write (verdict
/// recording); the two paths never share a connection.
#[derive(Debug)]
pub struct HostStore {
    conn: Connection,
}

impl HostStore {
    /// Open the store for penalty lookup only.
    ///
    /// The connection cannot mutate state; repeated reads are idempotent.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { conn })
    }

    /// Open the store for verdict recording.
    ///
    /// Uses TRUNCATE journaling, which reclaims journal space after every
    /// write with no external maintenance, and a busy timeout so that a
    /// writer blocks until it can acquire exclusivity.
    pub fn open_read_write(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)
            .map_err(|source| StoreError::Open {
                path: path.display().to_string(),
                source,
            })?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "journal_mode", "TRUNCATE")?;
        Ok(Self { conn })
    }

    /// Create the database file and provision the schema.
    ///
    /// Deployments run this once out of band; the gate itself only ever
    /// opens an existing store.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )
        .map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "journal_mode", "TRUNCATE")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS hosts(host TEXT PRIMARY KEY, penalty INTEGER);
             CREATE INDEX IF NOT EXISTS host_idx ON hosts(host);",
        )?;
        Ok(Self { conn })
    }

    /// Return the stored penalty for `host`, or 0 if no record exists.
    ///
    /// An out-of-range stored value (negative, or wider than u32) is
    /// reported as 0; the gate additionally clamps to [0, 60] before
    /// sleeping.
    pub fn get_penalty(&self, host: &str) -> Result<u32, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT penalty FROM hosts WHERE host = ?1")?;
        let mut rows = stmt.query([host])?;
        match rows.next()? {
            Some(row) => {
                let raw: i64 = row.get(0)?;
                Ok(u32::try_from(raw).unwrap_or(0))
            }
            None => Ok(0),
        }
    }

    /// Record a suspicious verdict: insert with penalty 1, or bump an
    /// existing penalty by 1 up to the cap.
    ///
    /// A single upsert statement; two concurrent calls for the same host
    /// both apply, serialized by the database lock.
    pub fn record_suspicious(&self, host: &str) -> Result<(), StoreError> {
        self.conn.execute(
            &format!(
                "INSERT INTO hosts(host, penalty) VALUES(?1, 1) \
                 ON CONFLICT(host) DO UPDATE SET penalty = min(penalty + 1, {MAX_PENALTY_SECS})"
            ),
            [host],
        )?;
        Ok(())
    }

    /// Record a benign verdict: delete any record for `host`.
    ///
    /// No-op if the host has no record.
    pub fn record_benign(&self, host: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM hosts WHERE host = ?1", [host])?;
        Ok(())
    }
}
