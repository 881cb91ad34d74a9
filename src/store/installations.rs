//! Installed versions on disk.

use rusqlite::{Row, params};

use super::{Store, StoreError, now};
use crate::types::InstalledPath;

/// One concrete installed version, rooted at a versioned payload directory.
#[derive(Debug, Clone)]
pub struct Installation {
    pub id: i64,
    pub binary_id: i64,
    pub version: String,
    /// The extracted executable file itself, never the symlink.
    pub installed_path: InstalledPath,
    pub source_url: String,
    pub file_size: u64,
    pub checksum: String,
    pub checksum_algorithm: String,
    pub installed_at: String,
}

impl Installation {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            binary_id: row.get("binary_id")?,
            version: row.get("version")?,
            installed_path: InstalledPath::new(row.get::<_, String>("installed_path")?),
            source_url: row.get("source_url")?,
            file_size: row.get::<_, i64>("file_size")? as u64,
            checksum: row.get("checksum")?,
            checksum_algorithm: row.get("checksum_algorithm")?,
            installed_at: row.get("installed_at")?,
        })
    }
}

const INSTALLATION_COLUMNS: &str = "id, binary_id, version, installed_path, source_url,
     file_size, checksum, checksum_algorithm, installed_at";

/// Input for recording a new installation.
#[derive(Debug, Clone)]
pub struct NewInstallation<'a> {
    pub binary_id: i64,
    pub version: &'a str,
    pub installed_path: &'a InstalledPath,
    pub source_url: &'a str,
    pub file_size: u64,
    pub checksum: &'a str,
}

impl Store {
    pub fn create_installation(
        &self,
        new: &NewInstallation<'_>,
    ) -> Result<Installation, StoreError> {
        self.conn()
            .execute(
                "INSERT INTO installations
                 (binary_id, version, installed_path, source_url, file_size, checksum,
                  checksum_algorithm, installed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'SHA256', ?7)",
                params![
                    new.binary_id,
                    new.version,
                    new.installed_path.as_path().to_string_lossy(),
                    new.source_url,
                    new.file_size as i64,
                    new.checksum,
                    now(),
                ],
            )
            .map_err(|e| {
                StoreError::from_write(
                    e,
                    &format!("installation #{} {}", new.binary_id, new.version),
                )
            })?;

        self.get_installation_by_id(self.conn().last_insert_rowid())
    }

    pub fn get_installation(
        &self,
        binary_id: i64,
        version: &str,
    ) -> Result<Installation, StoreError> {
        self.conn()
            .query_row(
                &format!(
                    "SELECT {INSTALLATION_COLUMNS} FROM installations
                     WHERE binary_id = ?1 AND version = ?2"
                ),
                params![binary_id, version],
                Installation::from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("installation {version} of binary #{binary_id}"))
                }
                other => StoreError::Sqlite(other),
            })
    }

    pub fn get_installation_by_id(&self, id: i64) -> Result<Installation, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT {INSTALLATION_COLUMNS} FROM installations WHERE id = ?1"),
                params![id],
                Installation::from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("installation #{id}"))
                }
                other => StoreError::Sqlite(other),
            })
    }

    /// All installations of a binary, most recent first.
    pub fn list_installations(&self, binary_id: i64) -> Result<Vec<Installation>, StoreError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {INSTALLATION_COLUMNS} FROM installations
             WHERE binary_id = ?1 ORDER BY installed_at DESC, id DESC"
        ))?;
        let rows = stmt.query_map(params![binary_id], Installation::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_latest_installation(
        &self,
        binary_id: i64,
    ) -> Result<Option<Installation>, StoreError> {
        Ok(self.list_installations(binary_id)?.into_iter().next())
    }

    pub fn delete_installation(&self, id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM installations WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("installation #{id}")));
        }
        Ok(())
    }

    /// Re-hash the payload on disk and compare against the recorded checksum.
    pub fn verify_installation_checksum(
        &self,
        installation: &Installation,
    ) -> Result<bool, StoreError> {
        match crate::io::digest::hash_file(installation.installed_path.as_path()) {
            Ok(digest) => Ok(digest.as_str() == installation.checksum),
            Err(_) => Ok(false),
        }
    }
}
