//! Cache bookkeeping for downloaded archives.

use rusqlite::{Row, params};

use super::{Store, StoreError, now};

#[derive(Debug, Clone)]
pub struct Download {
    pub id: i64,
    pub binary_id: i64,
    pub version: String,
    pub cache_path: String,
    pub source_url: String,
    pub file_size: u64,
    pub checksum: Option<String>,
    pub checksum_algorithm: String,
    pub downloaded_at: String,
    pub last_accessed_at: String,
    pub is_complete: bool,
}

impl Download {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            binary_id: row.get("binary_id")?,
            version: row.get("version")?,
            cache_path: row.get("cache_path")?,
            source_url: row.get("source_url")?,
            file_size: row.get::<_, i64>("file_size")? as u64,
            checksum: row.get("checksum")?,
            checksum_algorithm: row.get("checksum_algorithm")?,
            downloaded_at: row.get("downloaded_at")?,
            last_accessed_at: row.get("last_accessed_at")?,
            is_complete: row.get("is_complete")?,
        })
    }
}

const DOWNLOAD_COLUMNS: &str = "id, binary_id, version, cache_path, source_url, file_size,
     checksum, checksum_algorithm, downloaded_at, last_accessed_at, is_complete";

impl Store {
    /// Record a fetched archive. `cache_path` is unique; re-recording the
    /// same path is a `Duplicate`.
    pub fn create_download(
        &self,
        binary_id: i64,
        version: &str,
        cache_path: &str,
        source_url: &str,
        file_size: u64,
        checksum: Option<&str>,
    ) -> Result<Download, StoreError> {
        let ts = now();
        self.conn()
            .execute(
                "INSERT INTO downloads
                 (binary_id, version, cache_path, source_url, file_size, checksum,
                  checksum_algorithm, downloaded_at, last_accessed_at, is_complete)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'SHA256', ?7, ?7, 0)",
                params![binary_id, version, cache_path, source_url, file_size as i64, checksum, ts],
            )
            .map_err(|e| StoreError::from_write(e, &format!("download '{cache_path}'")))?;

        self.get_download_by_id(self.conn().last_insert_rowid())
    }

    pub fn get_download(
        &self,
        binary_id: i64,
        version: &str,
    ) -> Result<Option<Download>, StoreError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {DOWNLOAD_COLUMNS} FROM downloads
                 WHERE binary_id = ?1 AND version = ?2
                 ORDER BY downloaded_at DESC LIMIT 1"
            ),
            params![binary_id, version],
            Download::from_row,
        );
        match result {
            Ok(d) => Ok(Some(d)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    fn get_download_by_id(&self, id: i64) -> Result<Download, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE id = ?1"),
                params![id],
                Download::from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("download #{id}"))
                }
                other => StoreError::Sqlite(other),
            })
    }

    pub fn touch_download(&self, id: i64) -> Result<(), StoreError> {
        self.conn().execute(
            "UPDATE downloads SET last_accessed_at = ?1 WHERE id = ?2",
            params![now(), id],
        )?;
        Ok(())
    }

    pub fn mark_download_complete(&self, id: i64, checksum: &str) -> Result<(), StoreError> {
        let changed = self.conn().execute(
            "UPDATE downloads SET is_complete = 1, checksum = ?1 WHERE id = ?2",
            params![checksum, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("download #{id}")));
        }
        Ok(())
    }

    /// Complete downloads not accessed since `cutoff`, oldest first. LRU
    /// eviction candidates.
    pub fn list_downloads_for_cleanup(
        &self,
        cutoff: &str,
        limit: usize,
    ) -> Result<Vec<Download>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads
             WHERE is_complete = 1 AND last_accessed_at < ?1
             ORDER BY last_accessed_at ASC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![cutoff, limit as i64], Download::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Rows never marked complete; they may be resumed or discarded.
    pub fn list_incomplete_downloads(&self) -> Result<Vec<Download>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE is_complete = 0
             ORDER BY downloaded_at ASC"
        ))?;
        let rows = stmt.query_map([], Download::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn list_downloads_by_binary(&self, binary_id: i64) -> Result<Vec<Download>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DOWNLOAD_COLUMNS} FROM downloads WHERE binary_id = ?1
             ORDER BY downloaded_at DESC"
        ))?;
        let rows = stmt.query_map(params![binary_id], Download::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn delete_download(&self, id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM downloads WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("download #{id}")));
        }
        Ok(())
    }
}
