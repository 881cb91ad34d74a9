//! SQLite catalogue of binaries, installations, active versions, cached
//! downloads, and the operation log.
//!
//! The store owns the single `rusqlite::Connection`; there is exactly one
//! writer by construction. WAL journaling, foreign keys, and a 5 second busy
//! timeout are set on open.

pub mod active;
pub mod binaries;
pub mod downloads;
pub mod installations;
pub mod logs;

use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

pub use active::{ActiveVersion, ActiveWithInstallation};
pub use binaries::{Binary, BinaryDescriptor, BinarySource, SyncReport};
pub use downloads::Download;
pub use installations::{Installation, NewInstallation};
pub use logs::{Audit, LogStatus, OperationLogEntry};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate: {0}")]
    Duplicate(String),

    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Classify a rusqlite error raised by a write, attaching context.
    fn from_write(err: rusqlite::Error, what: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(e, _) = &err {
            match e.code {
                rusqlite::ErrorCode::ConstraintViolation => {
                    let msg = err.to_string();
                    if msg.contains("FOREIGN KEY") {
                        return Self::ForeignKey(what.to_string());
                    }
                    return Self::Duplicate(what.to_string());
                }
                _ => {}
            }
        }
        Self::Sqlite(err)
    }
}

/// Current time as stored in the database (RFC 3339, UTC).
pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

const MIGRATIONS: &[(i64, &str)] = &[(
    1,
    "
    CREATE TABLE binaries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        alias TEXT,
        provider TEXT NOT NULL,
        provider_path TEXT NOT NULL,
        asset_regex TEXT,
        tag_prefix TEXT,
        install_path TEXT,
        format TEXT NOT NULL,
        authenticated INTEGER NOT NULL DEFAULT 0,
        source TEXT NOT NULL CHECK(source IN ('config', 'manual')),
        config_version INTEGER NOT NULL DEFAULT 0,
        config_digest TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX idx_binaries_name ON binaries(name);

    CREATE TABLE installations (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        binary_id INTEGER NOT NULL REFERENCES binaries(id) ON DELETE CASCADE,
        version TEXT NOT NULL,
        installed_path TEXT NOT NULL,
        source_url TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        checksum TEXT NOT NULL,
        checksum_algorithm TEXT NOT NULL DEFAULT 'SHA256',
        installed_at TEXT NOT NULL,
        UNIQUE(binary_id, version)
    );

    CREATE INDEX idx_installations_binary ON installations(binary_id);

    CREATE TABLE active_versions (
        binary_id INTEGER PRIMARY KEY REFERENCES binaries(id) ON DELETE CASCADE,
        installation_id INTEGER NOT NULL REFERENCES installations(id) ON DELETE CASCADE,
        symlink_path TEXT NOT NULL,
        activated_at TEXT NOT NULL
    );

    CREATE TABLE downloads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        binary_id INTEGER NOT NULL REFERENCES binaries(id) ON DELETE CASCADE,
        version TEXT NOT NULL,
        cache_path TEXT NOT NULL UNIQUE,
        source_url TEXT NOT NULL,
        file_size INTEGER NOT NULL,
        checksum TEXT,
        checksum_algorithm TEXT NOT NULL DEFAULT 'SHA256',
        downloaded_at TEXT NOT NULL,
        last_accessed_at TEXT NOT NULL,
        is_complete INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX idx_downloads_binary ON downloads(binary_id);

    CREATE TABLE operation_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        operation TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('started', 'success', 'failed')),
        entity_type TEXT,
        entity_id INTEGER,
        message TEXT,
        error_details TEXT,
        metadata TEXT,
        created_at TEXT NOT NULL,
        duration_ms INTEGER,
        user_context TEXT
    );

    CREATE INDEX idx_oplog_operation ON operation_log(operation);
    CREATE INDEX idx_oplog_status ON operation_log(status);
    ",
)];

/// Durable catalogue backed by a single-file SQLite database.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at `path`, applying pending migrations.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// An in-memory store, for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;
            PRAGMA busy_timeout=5000;
            ",
        )?;

        let mut store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    /// Apply pending migrations, each in its own transaction. Failures roll
    /// back the migration being applied and surface as errors.
    fn migrate(&mut self) -> Result<(), StoreError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let current: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?;

        for (version, sql) in MIGRATIONS {
            if *version <= current {
                continue;
            }
            tracing::debug!(version, "applying schema migration");
            let tx = self.conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now()],
            )?;
            tx.commit()?;
        }

        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Schema version currently applied.
    pub fn schema_version(&self) -> Result<i64, StoreError> {
        Ok(self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )?)
    }
}
