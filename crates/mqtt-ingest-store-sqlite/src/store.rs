// crates/mqtt-ingest-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Message Store
// Description: Durable message sink backed by SQLite.
// Purpose: Append every inbound message as one immutable row.
// Dependencies: mqtt-ingest-core, rusqlite, serde, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`SqliteMessageStore`] owns a single connection and appends one row per
//! inbound message to the `messages` table. Schema creation is idempotent, so
//! reopening an existing database neither errors nor duplicates objects. The
//! insert statement is prepared once at open through the connection's
//! statement cache and reused for every write; SQLite resets it after each
//! execution whether or not the write succeeded.
//!
//! Payloads are bound as TEXT from their raw bytes, cut at the first NUL.
//! Non-UTF-8 bytes are stored unchanged and read back lossily.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mqtt_ingest_core::Clock;
use mqtt_ingest_core::InboundMessage;
use mqtt_ingest_core::MessageRecord;
use mqtt_ingest_core::MessageSink;
use mqtt_ingest_core::QualityOfService;
use mqtt_ingest_core::SinkError;
use mqtt_ingest_core::SystemClock;
use mqtt_ingest_core::unix_seconds;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::ToSql;
use rusqlite::params;
use rusqlite::types::ToSqlOutput;
use rusqlite::types::ValueRef;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use tracing::info;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default database location.
pub const DEFAULT_DB_PATH: &str = "./mqtt_messages.db";
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Idempotent table and index definitions.
const SCHEMA_SQL: &str = "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ts INTEGER NOT NULL,
        topic TEXT NOT NULL,
        payload TEXT NOT NULL,
        qos INTEGER NOT NULL,
        retain INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_messages_ts ON messages (ts);
    CREATE INDEX IF NOT EXISTS idx_messages_topic ON messages (topic);";

/// Insert statement held in the connection's statement cache.
const INSERT_SQL: &str =
    "INSERT INTO messages (ts, topic, payload, qos, retain) VALUES (?1, ?2, ?3, ?4, ?5)";

/// Most recent record.
const LATEST_SQL: &str =
    "SELECT id, ts, topic, payload, qos, retain FROM messages ORDER BY id DESC LIMIT 1";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode.
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode.
    Full,
    /// Normal synchronous mode; durable across process crashes under WAL.
    #[default]
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` message store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a config for `path` with default pragmas.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Default database path.
fn default_db_path() -> PathBuf {
    PathBuf::from(DEFAULT_DB_PATH)
}

/// Default busy timeout.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Messages carry the underlying `SQLite` or I/O error text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Invalid store configuration or data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for SinkError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Write(error.to_string())
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Append-only message store on a single `SQLite` connection.
///
/// # Invariants
/// - The connection is owned exclusively; callers serialize access through
///   `&mut self`.
/// - Row identifiers increase strictly in insert order.
pub struct SqliteMessageStore {
    /// Open database connection.
    connection: Connection,
    /// Configuration used to open the store.
    config: SqliteStoreConfig,
    /// Source of receipt timestamps.
    clock: Arc<dyn Clock>,
}

impl SqliteMessageStore {
    /// Opens the store, creating the database and schema when missing.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is invalid or when opening,
    /// configuring, initializing, or preparing the insert fails.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Opens the store with an explicit timestamp clock.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] under the same conditions as [`Self::open`].
    pub fn open_with_clock(
        config: SqliteStoreConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        connection
            .prepare_cached(INSERT_SQL)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        info!(
            path = %config.path.display(),
            journal_mode = config.journal_mode.pragma_value(),
            sync_mode = config.sync_mode.pragma_value(),
            "sqlite message store opened"
        );
        Ok(Self {
            connection,
            config,
            clock,
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Appends one message and returns its row identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] with the `SQLite` error text when the
    /// insert fails.
    pub fn insert(&mut self, message: &InboundMessage) -> Result<i64, SqliteStoreError> {
        let received_at = unix_seconds(self.clock.now());
        let mut statement = self
            .connection
            .prepare_cached(INSERT_SQL)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let sequence_id = statement
            .insert(params![
                received_at,
                message.topic,
                PayloadText(message.payload_text_bytes()),
                i64::from(message.qos.level()),
                i64::from(message.retain),
            ])
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        debug!(sequence_id, topic = %message.topic, "message row inserted");
        Ok(sequence_id)
    }

    /// Returns the most recently inserted record.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or the row is malformed.
    pub fn latest_record(&self) -> Result<Option<MessageRecord>, SqliteStoreError> {
        let raw = self
            .connection
            .query_row(LATEST_SQL, params![], read_raw_record)
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        raw.map(RawRecord::into_record).transpose()
    }

    /// Returns the number of stored records.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the query fails.
    pub fn message_count(&self) -> Result<u64, SqliteStoreError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM messages", params![], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        u64::try_from(count)
            .map_err(|_| SqliteStoreError::Invalid("negative row count".to_string()))
    }
}

impl MessageSink for SqliteMessageStore {
    fn insert(&mut self, message: &InboundMessage) -> Result<i64, SinkError> {
        Self::insert(self, message).map_err(SinkError::from)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Payload bytes bound as `SQLite` TEXT without UTF-8 rewriting.
struct PayloadText<'a>(&'a [u8]);

impl ToSql for PayloadText<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(ValueRef::Text(self.0)))
    }
}

/// Row columns before domain validation.
struct RawRecord {
    /// `id` column.
    id: i64,
    /// `ts` column.
    ts: i64,
    /// `topic` column.
    topic: String,
    /// `payload` column, decoded lossily.
    payload: String,
    /// `qos` column.
    qos: i64,
    /// `retain` column.
    retain: i64,
}

impl RawRecord {
    /// Validates the raw columns into a [`MessageRecord`].
    fn into_record(self) -> Result<MessageRecord, SqliteStoreError> {
        let qos = u8::try_from(self.qos)
            .ok()
            .and_then(QualityOfService::from_level)
            .ok_or_else(|| SqliteStoreError::Invalid(format!("invalid qos {}", self.qos)))?;
        Ok(MessageRecord {
            sequence_id: self.id,
            received_at: self.ts,
            topic: self.topic,
            payload: self.payload,
            qos,
            retain: self.retain != 0,
        })
    }
}

/// Reads one `messages` row.
fn read_raw_record(row: &Row<'_>) -> rusqlite::Result<RawRecord> {
    let payload = match row.get_ref(3)? {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).into_owned()
        }
        _ => String::new(),
    };
    Ok(RawRecord {
        id: row.get(0)?,
        ts: row.get(1)?,
        topic: row.get(2)?,
        payload,
        qos: row.get(4)?,
        retain: row.get(5)?,
    })
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.display().to_string().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    let overlong = path
        .components()
        .any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH);
    if overlong {
        return Err(SqliteStoreError::Invalid(
            "store path contains an overlong component".to_string(),
        ));
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies the journal, sync, temp store, and busy timeout settings.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA temp_store = MEMORY;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Creates the messages table and its indexes when missing.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch(SCHEMA_SQL).map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    debug!("sqlite message schema ready");
    Ok(())
}
