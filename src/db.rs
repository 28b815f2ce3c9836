// 🗄️ Durable store - one SQLite file shared by credentials and audit log
//
// Every operation opens its own short-lived connection, runs one statement
// (or one small transaction), commits and drops the connection. Nothing keeps
// a write open between calls.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// Handle to the database file. Holds only the path.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Store { path: path.into() }
    }

    /// Open the file and make sure the schema exists.
    pub fn open(path: impl Into<PathBuf>) -> rusqlite::Result<Self> {
        let store = Store::new(path);
        let conn = store.connect()?;
        setup_database(&conn)?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scoped connection for a single operation.
    pub fn connect(&self) -> rusqlite::Result<Connection> {
        let conn = Connection::open(&self.path)?;
        apply_pragmas(&conn)?;
        Ok(conn)
    }
}

/// Per-connection settings. Writers queue on the file lock instead of failing fast.
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        PRAGMA busy_timeout = 5000;
        PRAGMA foreign_keys = ON;
        ",
    )
}

pub fn setup_database(conn: &Connection) -> rusqlite::Result<()> {
    // WAL is persistent on the file, so setting it once here is enough
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Users
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT UNIQUE NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Audit logs (append-only, one row per completed prediction)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS audit_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL REFERENCES users(username),
            ts TEXT NOT NULL,
            price_lacs REAL NOT NULL,
            city TEXT NOT NULL,
            area TEXT NOT NULL DEFAULT '',
            payload TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_audit_logs_user_ts ON audit_logs(username, ts)",
        [],
    )?;

    Ok(())
}

/// Fixed-width RFC 3339 so text order matches time order.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Offset-less ISO timestamps, as written by earlier versions of the app (UTC).
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse a stored timestamp column, reporting the column index on failure.
pub fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(raw, NAIVE_TIMESTAMP_FORMAT)
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| {
                rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(rfc_err))
            }),
    }
}

/// True when the error is a UNIQUE / FOREIGN KEY / NOT NULL violation.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
