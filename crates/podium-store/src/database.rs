//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::Result;
use crate::migrations;
use crate::models::ScoreScheme;
use crate::schema::column_exists;

/// Lock wait applied when the caller does not choose one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    score_scheme: ScoreScheme,
}

impl Database {
    /// Open (or create) a database at an explicit path.
    ///
    /// `busy_timeout` bounds how long a statement waits on a locked database
    /// before failing, which is the only query timeout the store enforces.
    pub fn open_at(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!(path = %path.display(), "opening database");

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::prepare(conn, busy_timeout)
    }

    /// Open a private in-memory database (tests and tooling).
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?, DEFAULT_BUSY_TIMEOUT)
    }

    fn prepare(mut conn: Connection, busy_timeout: Duration) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(busy_timeout)?;

        // Run schema migrations.
        migrations::run_migrations(&mut conn)?;

        // Decided once per connection, never per request.  Migrations always
        // leave `votes.rating` in place, so `LegacyVotes` is only reachable
        // if the column is dropped by hand; it keeps the historical weighting
        // on record.
        let score_scheme = if column_exists(&conn, "votes", "rating") {
            ScoreScheme::HalfPointRatings
        } else {
            ScoreScheme::LegacyVotes
        };
        tracing::debug!(?score_scheme, "profile scoring scheme");

        Ok(Self { conn, score_scheme })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return a mutable reference to the underlying connection, needed for
    /// transactions.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Start a write transaction that takes the database lock up front, so
    /// read-then-write sequences inside it cannot interleave with another
    /// writer.
    pub(crate) fn begin_immediate(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    pub fn score_scheme(&self) -> ScoreScheme {
        self.score_scheme
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

// ---------------------------------------------------------------------------
// Row conversion helpers
// ---------------------------------------------------------------------------

/// Timestamps are stored as fixed-width RFC-3339 UTC text so that
/// lexicographic order equals chronological order.
pub(crate) fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a TEXT column into one of the shared string enums.
pub(crate) fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
