//! Structured operation audit trail.
//!
//! Every lifecycle operation writes a `started` row up front and finishes it
//! as `success` or `failed`. Terminal rows are never mutated again.

use rusqlite::{Row, params};

use super::{Store, StoreError, now};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStatus {
    Started,
    Success,
    Failed,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "failed" => Self::Failed,
            _ => Self::Started,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperationLogEntry {
    pub id: i64,
    pub operation: String,
    pub status: LogStatus,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub message: Option<String>,
    pub error_details: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
    pub duration_ms: Option<i64>,
    pub user_context: Option<String>,
}

impl OperationLogEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let metadata: Option<String> = row.get("metadata")?;
        Ok(Self {
            id: row.get("id")?,
            operation: row.get("operation")?,
            status: LogStatus::parse(&row.get::<_, String>("status")?),
            entity_type: row.get("entity_type")?,
            entity_id: row.get("entity_id")?,
            message: row.get("message")?,
            error_details: row.get("error_details")?,
            metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
            created_at: row.get("created_at")?,
            duration_ms: row.get("duration_ms")?,
            user_context: row.get("user_context")?,
        })
    }
}

const LOG_COLUMNS: &str = "id, operation, status, entity_type, entity_id, message,
     error_details, metadata, created_at, duration_ms, user_context";

impl Store {
    /// Open a `started` row, returning its id for the terminal update.
    pub fn log_start(
        &self,
        operation: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        message: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64, StoreError> {
        self.conn().execute(
            "INSERT INTO operation_log
             (operation, status, entity_type, entity_id, message, metadata, created_at)
             VALUES (?1, 'started', ?2, ?3, ?4, ?5, ?6)",
            params![
                operation,
                entity_type,
                entity_id,
                message,
                metadata.map(|m| m.to_string()),
                now(),
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Attach the entity after the fact; installs only learn the binary id
    /// once the catalogue row is loaded.
    pub fn log_entity(
        &self,
        log_id: i64,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE operation_log SET entity_type = ?1, entity_id = ?2
             WHERE id = ?3 AND status = 'started'",
            params![entity_type, entity_id, log_id],
        )?;
        Ok(())
    }

    pub fn log_success(&self, log_id: i64, duration_ms: i64) -> Result<(), StoreError> {
        self.finish_log(log_id, LogStatus::Success, None, duration_ms)
    }

    pub fn log_failure(
        &self,
        log_id: i64,
        error_details: &str,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        self.finish_log(log_id, LogStatus::Failed, Some(error_details), duration_ms)
    }

    /// Status only moves forward; a terminal row is never rewritten.
    fn finish_log(
        &self,
        log_id: i64,
        status: LogStatus,
        error_details: Option<&str>,
        duration_ms: i64,
    ) -> Result<(), StoreError> {
        let changed = self.conn().execute(
            "UPDATE operation_log SET status = ?1, error_details = ?2, duration_ms = ?3
             WHERE id = ?4 AND status = 'started'",
            params![status.as_str(), error_details, duration_ms, log_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("open log entry #{log_id}")));
        }
        Ok(())
    }

    pub fn list_recent_logs(&self, limit: usize) -> Result<Vec<OperationLogEntry>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM operation_log ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], OperationLogEntry::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_logs_by_status(
        &self,
        status: LogStatus,
        limit: usize,
    ) -> Result<Vec<OperationLogEntry>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM operation_log WHERE status = ?1
             ORDER BY id DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(
            params![status.as_str(), limit as i64],
            OperationLogEntry::from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_logs_by_operation(
        &self,
        operation: &str,
        limit: usize,
    ) -> Result<Vec<OperationLogEntry>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM operation_log WHERE operation = ?1
             ORDER BY id DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(
            params![operation, limit as i64],
            OperationLogEntry::from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_logs_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<OperationLogEntry>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM operation_log
             WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY id DESC"
        ))?;
        let rows = stmt.query_map(params![entity_type, entity_id], OperationLogEntry::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

/// Bracketing helper: records `started` on creation and exactly one terminal
/// row via [`Audit::success`] or [`Audit::failure`].
pub struct Audit {
    log_id: i64,
    started: std::time::Instant,
}

impl Audit {
    pub fn start(store: &Store, operation: &str, message: &str) -> Result<Self, StoreError> {
        let log_id = store.log_start(operation, None, None, message, None)?;
        Ok(Self {
            log_id,
            started: std::time::Instant::now(),
        })
    }

    pub fn entity(&self, store: &Store, entity_type: &str, entity_id: i64) {
        if let Err(e) = store.log_entity(self.log_id, entity_type, entity_id) {
            tracing::warn!(log_id = self.log_id, "failed to attach log entity: {e}");
        }
    }

    pub fn success(self, store: &Store) {
        let elapsed = self.started.elapsed().as_millis() as i64;
        if let Err(e) = store.log_success(self.log_id, elapsed) {
            tracing::warn!(log_id = self.log_id, "failed to close log entry: {e}");
        }
    }

    pub fn failure(self, store: &Store, error: &str) {
        let elapsed = self.started.elapsed().as_millis() as i64;
        if let Err(e) = store.log_failure(self.log_id, error, elapsed) {
            tracing::warn!(log_id = self.log_id, "failed to close log entry: {e}");
        }
    }
}
