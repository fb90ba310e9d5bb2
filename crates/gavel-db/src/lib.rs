pub mod bids;
pub mod conversations;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod users;

use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage-layer error taxonomy. Routes map these onto HTTP errors; the
/// distinction between `NotFound` and `NotParticipant` exists so that the
/// API layer can collapse both to 404 without losing the log signal.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("caller is not a participant of this conversation")]
    NotParticipant,

    #[error("a conversation for this pair already exists")]
    PairExists,

    #[error("message content must not be empty")]
    EmptyContent,

    #[error("conversation participants must be distinct users")]
    SelfConversation,

    #[error("bidder is not linked to this property")]
    BidderNotLinked,

    #[error("bid rejected: {0}")]
    BidRejected(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn, path.display().to_string())
    }

    /// In-memory database for tests; same schema, no file on disk.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:".into())
    }

    fn init(conn: Connection, label: String) -> StoreResult<Self> {
        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Database opened at {}", label);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> StoreResult<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut conn)
    }
}

/// Current time as RFC 3339 with microsecond precision. Fixed-width, so
/// lexicographic order on the stored strings is chronological order;
/// SQLite's own datetime('now') is too coarse to order messages.
pub(crate) fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
