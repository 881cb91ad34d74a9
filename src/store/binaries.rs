//! Catalogued binary descriptors.

use rusqlite::{Row, params};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{Store, StoreError, now};
use crate::types::ArchiveFormat;

/// Provenance of a catalogue entry. Config-sourced rows are owned by the
/// declarative sync and may be deleted when absent from the config file;
/// manual rows are never touched by sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinarySource {
    Config,
    Manual,
}

impl BinarySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Manual => "manual",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "config" => Self::Config,
            _ => Self::Manual,
        }
    }
}

/// A user's declaration of a managed binary, independent of any installed
/// version. Mirrors the `binaries` table.
#[derive(Debug, Clone)]
pub struct Binary {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub alias: Option<String>,
    pub provider: String,
    pub provider_path: String,
    pub asset_regex: Option<String>,
    /// Literal prefix prepended to user-typed versions to form the upstream
    /// tag. Historically misnamed "release regex"; it is never compiled.
    pub tag_prefix: Option<String>,
    pub install_path: Option<String>,
    pub format: ArchiveFormat,
    pub authenticated: bool,
    pub source: BinarySource,
    pub config_version: i64,
    pub config_digest: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Binary {
    /// Name the symlink should carry: the alias when one is set.
    pub fn link_name(&self) -> &str {
        match &self.alias {
            Some(alias) if !alias.is_empty() => alias,
            _ => &self.name,
        }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let format: String = row.get("format")?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            alias: row.get("alias")?,
            provider: row.get("provider")?,
            provider_path: row.get("provider_path")?,
            asset_regex: row.get("asset_regex")?,
            tag_prefix: row.get("tag_prefix")?,
            install_path: row.get("install_path")?,
            format: ArchiveFormat::parse(&format).unwrap_or(ArchiveFormat::TarGz),
            authenticated: row.get("authenticated")?,
            source: BinarySource::parse(&row.get::<_, String>("source")?),
            config_version: row.get("config_version")?,
            config_digest: row.get("config_digest")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

const BINARY_COLUMNS: &str = "id, user_id, name, alias, provider, provider_path, asset_regex,
     tag_prefix, install_path, format, authenticated, source, config_version,
     config_digest, created_at, updated_at";

/// Declarative input for creating or syncing a binary: the Binary shape less
/// surrogate id, provenance, and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryDescriptor {
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub provider: String,
    pub provider_path: String,
    #[serde(default)]
    pub asset_regex: Option<String>,
    #[serde(default, alias = "release_regex")]
    pub tag_prefix: Option<String>,
    #[serde(default)]
    pub install_path: Option<String>,
    pub format: ArchiveFormat,
    #[serde(default)]
    pub authenticated: bool,
}

impl BinaryDescriptor {
    /// Stable content digest over the canonical field tuple. Sync uses this
    /// to skip updates for unchanged descriptors.
    pub fn digest(&self) -> String {
        let blank = String::new();
        let tuple = [
            &self.user_id,
            &self.name,
            self.alias.as_ref().unwrap_or(&blank),
            &self.provider,
            &self.provider_path,
            self.asset_regex.as_ref().unwrap_or(&blank),
            self.tag_prefix.as_ref().unwrap_or(&blank),
            self.install_path.as_ref().unwrap_or(&blank),
        ];
        let mut hasher = Sha256::new();
        for field in tuple {
            hasher.update(field.as_bytes());
            hasher.update(b"|");
        }
        hasher.update(self.format.extension().as_bytes());
        hasher.update(b"|");
        hasher.update(if self.authenticated { b"1" } else { b"0" });
        hex::encode(hasher.finalize())
    }
}

impl Store {
    /// Insert a new binary. Fails with `Duplicate` if `user_id` is taken.
    pub fn create_binary(
        &self,
        desc: &BinaryDescriptor,
        source: BinarySource,
        config_version: i64,
    ) -> Result<Binary, StoreError> {
        let ts = now();
        self.conn()
            .execute(
                "INSERT INTO binaries
                 (user_id, name, alias, provider, provider_path, asset_regex, tag_prefix,
                  install_path, format, authenticated, source, config_version, config_digest,
                  created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    desc.user_id,
                    desc.name,
                    desc.alias,
                    desc.provider,
                    desc.provider_path,
                    desc.asset_regex,
                    desc.tag_prefix,
                    desc.install_path,
                    desc.format.extension(),
                    desc.authenticated,
                    source.as_str(),
                    config_version,
                    desc.digest(),
                    ts,
                    ts,
                ],
            )
            .map_err(|e| StoreError::from_write(e, &format!("binary '{}'", desc.user_id)))?;

        self.get_binary(self.conn().last_insert_rowid())
    }

    pub fn get_binary(&self, id: i64) -> Result<Binary, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT {BINARY_COLUMNS} FROM binaries WHERE id = ?1"),
                params![id],
                Binary::from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("binary #{id}"))
                }
                other => StoreError::Sqlite(other),
            })
    }

    pub fn get_binary_by_user_id(&self, user_id: &str) -> Result<Binary, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT {BINARY_COLUMNS} FROM binaries WHERE user_id = ?1"),
                params![user_id],
                Binary::from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("binary '{user_id}'"))
                }
                other => StoreError::Sqlite(other),
            })
    }

    pub fn get_binary_by_name(&self, name: &str) -> Result<Binary, StoreError> {
        self.conn()
            .query_row(
                &format!("SELECT {BINARY_COLUMNS} FROM binaries WHERE name = ?1 LIMIT 1"),
                params![name],
                Binary::from_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    StoreError::NotFound(format!("binary named '{name}'"))
                }
                other => StoreError::Sqlite(other),
            })
    }

    pub fn list_binaries(&self) -> Result<Vec<Binary>, StoreError> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {BINARY_COLUMNS} FROM binaries ORDER BY user_id"))?;
        let rows = stmt.query_map([], Binary::from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Update all mutable fields of a binary and bump `updated_at`.
    pub fn update_binary(&self, binary: &Binary) -> Result<(), StoreError> {
        let changed = self
            .conn()
            .execute(
                "UPDATE binaries SET
                 name = ?1, alias = ?2, provider = ?3, provider_path = ?4, asset_regex = ?5,
                 tag_prefix = ?6, install_path = ?7, format = ?8, authenticated = ?9,
                 source = ?10, config_version = ?11, config_digest = ?12, updated_at = ?13
                 WHERE id = ?14",
                params![
                    binary.name,
                    binary.alias,
                    binary.provider,
                    binary.provider_path,
                    binary.asset_regex,
                    binary.tag_prefix,
                    binary.install_path,
                    binary.format.extension(),
                    binary.authenticated,
                    binary.source.as_str(),
                    binary.config_version,
                    binary.config_digest,
                    now(),
                    binary.id,
                ],
            )
            .map_err(|e| StoreError::from_write(e, &format!("binary '{}'", binary.user_id)))?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("binary #{}", binary.id)));
        }
        Ok(())
    }

    /// Delete a binary; installations, active version, and downloads cascade.
    pub fn delete_binary(&self, id: i64) -> Result<(), StoreError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM binaries WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(format!("binary #{id}")));
        }
        Ok(())
    }

    /// Reconcile the catalogue with a declared config generation.
    ///
    /// Every descriptor is upserted (skipping rows whose digest is
    /// unchanged); config-sourced rows absent from the list are deleted;
    /// manual rows are preserved regardless.
    pub fn sync_from_config(
        &mut self,
        descriptors: &[BinaryDescriptor],
        config_version: i64,
    ) -> Result<SyncReport, StoreError> {
        let mut report = SyncReport::default();

        for desc in descriptors {
            match self.get_binary_by_user_id(&desc.user_id) {
                Ok(existing) => {
                    let digest = desc.digest();
                    if existing.config_digest.as_deref() == Some(digest.as_str()) {
                        report.unchanged += 1;
                        continue;
                    }
                    let updated = Binary {
                        name: desc.name.clone(),
                        alias: desc.alias.clone(),
                        provider: desc.provider.clone(),
                        provider_path: desc.provider_path.clone(),
                        asset_regex: desc.asset_regex.clone(),
                        tag_prefix: desc.tag_prefix.clone(),
                        install_path: desc.install_path.clone(),
                        format: desc.format,
                        authenticated: desc.authenticated,
                        config_version,
                        config_digest: Some(digest),
                        ..existing
                    };
                    self.update_binary(&updated)?;
                    report.updated += 1;
                }
                Err(StoreError::NotFound(_)) => {
                    self.create_binary(desc, BinarySource::Config, config_version)?;
                    report.created += 1;
                }
                Err(e) => return Err(e),
            }
        }

        // Remove config-sourced rows no longer declared.
        let declared: Vec<&str> = descriptors.iter().map(|d| d.user_id.as_str()).collect();
        for binary in self.list_binaries()? {
            if binary.source == BinarySource::Config
                && !declared.contains(&binary.user_id.as_str())
            {
                self.delete_binary(binary.id)?;
                report.deleted += 1;
            }
        }

        Ok(report)
    }
}

/// Outcome counts of a config sync.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}
