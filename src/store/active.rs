//! The at-most-one active version per binary.

use rusqlite::{Row, params};

use super::installations::Installation;
use super::{Store, StoreError, now};
use crate::types::SymlinkPath;

#[derive(Debug, Clone)]
pub struct ActiveVersion {
    pub binary_id: i64,
    pub installation_id: i64,
    pub symlink_path: SymlinkPath,
    pub activated_at: String,
}

impl ActiveVersion {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            binary_id: row.get("binary_id")?,
            installation_id: row.get("installation_id")?,
            symlink_path: SymlinkPath::new(row.get::<_, String>("symlink_path")?),
            activated_at: row.get("activated_at")?,
        })
    }
}

/// Active version joined with its installation row.
#[derive(Debug, Clone)]
pub struct ActiveWithInstallation {
    pub active: ActiveVersion,
    pub installation: Installation,
}

impl Store {
    /// Upsert the active version for a binary. The referenced installation
    /// must belong to the same binary.
    pub fn set_active_version(
        &self,
        binary_id: i64,
        installation_id: i64,
        symlink_path: &SymlinkPath,
    ) -> Result<(), StoreError> {
        let installation = self.get_installation_by_id(installation_id)?;
        if installation.binary_id != binary_id {
            return Err(StoreError::ForeignKey(format!(
                "installation #{installation_id} does not belong to binary #{binary_id}"
            )));
        }

        self.conn()
            .execute(
                "INSERT INTO active_versions (binary_id, installation_id, symlink_path, activated_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(binary_id) DO UPDATE SET
                     installation_id = excluded.installation_id,
                     symlink_path = excluded.symlink_path,
                     activated_at = excluded.activated_at",
                params![
                    binary_id,
                    installation_id,
                    symlink_path.as_path().to_string_lossy(),
                    now(),
                ],
            )
            .map_err(|e| {
                StoreError::from_write(e, &format!("active version of binary #{binary_id}"))
            })?;
        Ok(())
    }

    pub fn get_active_version(&self, binary_id: i64) -> Result<Option<ActiveVersion>, StoreError> {
        let result = self.conn().query_row(
            "SELECT binary_id, installation_id, symlink_path, activated_at
             FROM active_versions WHERE binary_id = ?1",
            params![binary_id],
            ActiveVersion::from_row,
        );
        match result {
            Ok(active) => Ok(Some(active)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Active version joined with its installation, or `None` when nothing
    /// is active.
    pub fn get_active_with_installation(
        &self,
        binary_id: i64,
    ) -> Result<Option<ActiveWithInstallation>, StoreError> {
        let Some(active) = self.get_active_version(binary_id)? else {
            return Ok(None);
        };
        let installation = self.get_installation_by_id(active.installation_id)?;
        Ok(Some(ActiveWithInstallation {
            active,
            installation,
        }))
    }

    pub fn unset_active_version(&self, binary_id: i64) -> Result<(), StoreError> {
        self.conn().execute(
            "DELETE FROM active_versions WHERE binary_id = ?1",
            params![binary_id],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BinarySource;
    use crate::store::binaries::tests::descriptor;
    use crate::store::installations::NewInstallation;
    use crate::types::InstalledPath;

    fn seed(store: &Store, user_id: &str, version: &str) -> (i64, i64) {
        let binary = store
            .create_binary(&descriptor(user_id), BinarySource::Manual, 0)
            .unwrap();
        let path = InstalledPath::new(format!("/data/versions/{user_id}/{version}/{user_id}"));
        let inst = store
            .create_installation(&NewInstallation {
                binary_id: binary.id,
                version,
                installed_path: &path,
                source_url: "u",
                file_size: 1,
                checksum: "c",
            })
            .unwrap();
        (binary.id, inst.id)
    }

    #[test]
    fn set_then_get_with_installation() {
        let store = Store::open_in_memory().unwrap();
        let (binary_id, inst_id) = seed(&store, "gh", "v1");
        let link = SymlinkPath::new("/home/u/.local/bin/gh");

        store.set_active_version(binary_id, inst_id, &link).unwrap();
        let joined = store
            .get_active_with_installation(binary_id)
            .unwrap()
            .unwrap();
        assert_eq!(joined.active.installation_id, inst_id);
        assert_eq!(joined.installation.version, "v1");
        assert_eq!(joined.active.symlink_path, link);
    }

    #[test]
    fn set_is_upsert() {
        let store = Store::open_in_memory().unwrap();
        let (binary_id, inst1) = seed(&store, "gh", "v1");
        let inst2 = store
            .create_installation(&NewInstallation {
                binary_id,
                version: "v2",
                installed_path: &InstalledPath::new("/data/versions/gh/v2/gh"),
                source_url: "u",
                file_size: 1,
                checksum: "c",
            })
            .unwrap();
        let link = SymlinkPath::new("/bin/gh");

        store.set_active_version(binary_id, inst1, &link).unwrap();
        store
            .set_active_version(binary_id, inst2.id, &link)
            .unwrap();

        let active = store.get_active_version(binary_id).unwrap().unwrap();
        assert_eq!(active.installation_id, inst2.id);
    }

    #[test]
    fn rejects_installation_of_other_binary() {
        let store = Store::open_in_memory().unwrap();
        let (binary_a, _) = seed(&store, "a", "v1");
        let (_, inst_b) = seed(&store, "b", "v1");
        let link = SymlinkPath::new("/bin/a");

        let err = store
            .set_active_version(binary_a, inst_b, &link)
            .unwrap_err();
        assert!(matches!(err, StoreError::ForeignKey(_)));
    }

    #[test]
    fn unset_and_cascade() {
        let store = Store::open_in_memory().unwrap();
        let (binary_id, inst_id) = seed(&store, "gh", "v1");
        let link = SymlinkPath::new("/bin/gh");
        store.set_active_version(binary_id, inst_id, &link).unwrap();

        store.unset_active_version(binary_id).unwrap();
        assert!(store.get_active_version(binary_id).unwrap().is_none());

        store.set_active_version(binary_id, inst_id, &link).unwrap();
        store.delete_installation(inst_id).unwrap();
        assert!(store.get_active_version(binary_id).unwrap().is_none());
    }
}
