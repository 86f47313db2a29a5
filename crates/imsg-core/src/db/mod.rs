//! Read-only access to the Messages database.
//!
//! The database is owned by the OS and treated as append-only; we open it
//! read-only and never take writes or locks of our own. Schema capabilities
//! are probed once at open and kept for the life of the connection.

mod query;

pub use query::Message;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::schema::Capabilities;

/// Seconds between the Unix epoch and the Apple reference date (2001-01-01).
const APPLE_EPOCH_OFFSET: i64 = 978_307_200;

/// Raw `date` values at or above this are nanoseconds, below are seconds.
/// High Sierra switched the column to nanosecond precision.
const NANOSECOND_THRESHOLD: i64 = 1_000_000_000_000;

/// One read-only connection to a Messages database.
pub struct MessageDb {
    conn: Connection,
    caps: Capabilities,
}

impl MessageDb {
    /// Open the database at the given path read-only and probe its schema.
    pub fn open(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::DatabaseNotFound {
                path: path.display().to_string(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open database: {}", path.display()))?;

        Self::from_connection(conn).map_err(CoreError::Internal)
    }

    /// Wrap an already-open connection, probing capabilities.
    fn from_connection(conn: Connection) -> Result<Self> {
        let message_columns = table_columns(&conn, "message")?;
        let attachment_columns = table_columns(&conn, "attachment")?;
        let caps = Capabilities::probe(&message_columns, &attachment_columns);
        debug!(?caps, "probed schema capabilities");
        Ok(Self { conn, caps })
    }

    /// Capability flags probed at open.
    #[must_use]
    pub const fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Column names of a table, for callers that need their own probing.
    pub fn table_columns(&self, table: &str) -> CoreResult<HashSet<String>> {
        table_columns(&self.conn, table).map_err(CoreError::Internal)
    }

    /// Total number of rows in the `message` table (events included).
    pub fn message_count(&self) -> CoreResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM message", [], |row| row.get(0))
            .context("Failed to count messages")?;
        Ok(count)
    }

    /// Get a reference to the underlying connection (for advanced queries).
    #[must_use]
    pub const fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Enumerate the column names of `table`.
///
/// A missing table yields an empty set, matching the probe contract that
/// absence means `false`, never failure.
fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .context("Failed to prepare table_info query")?;
    let names = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .with_context(|| format!("Failed to enumerate columns of {table}"))?
        .collect::<std::result::Result<HashSet<_>, _>>()
        .with_context(|| format!("Failed to read columns of {table}"))?;
    Ok(names)
}

/// Convert a raw Messages `date` value to UTC.
///
/// Values are offsets from the Apple reference date, in nanoseconds on
/// modern schemas and whole seconds on ancient ones. Out-of-range values
/// collapse to the Unix epoch rather than failing.
#[must_use]
pub fn apple_time_to_utc(raw: i64) -> DateTime<Utc> {
    let (secs, nanos) = if raw.abs() >= NANOSECOND_THRESHOLD {
        let nanos = u32::try_from((raw % 1_000_000_000).unsigned_abs()).unwrap_or(0);
        (raw / 1_000_000_000, nanos)
    } else {
        (raw, 0)
    };
    Utc.timestamp_opt(APPLE_EPOCH_OFFSET + secs, nanos)
        .single()
        .unwrap_or_default()
}
