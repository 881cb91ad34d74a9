//! On-disk directory layout.
//!
//! All paths the engine touches are derived from one `Layout` value that is
//! built once (from the user's XDG/home directories) and injected through
//! the engine context, so tests can point the whole engine at a tempdir.

use std::path::{Path, PathBuf};

use crate::types::SymlinkPath;

pub const APP_DIR: &str = "armory";

/// Resolved directory roots for data, cache, and symlinks.
#[derive(Debug, Clone)]
pub struct Layout {
    data_dir: PathBuf,
    cache_dir: PathBuf,
    bin_dir: PathBuf,
}

impl Layout {
    /// Resolve from the user's environment. `XDG_DATA_HOME`, `XDG_CACHE_HOME`
    /// and `HOME` are honoured via the `dirs` lookups.
    ///
    /// Returns `None` if the home directory cannot be determined.
    pub fn from_env() -> Option<Self> {
        let data_dir = dirs::data_dir()?.join(APP_DIR);
        let cache_dir = dirs::cache_dir()?.join(APP_DIR);

        #[cfg(windows)]
        let bin_dir = cache_dir.join("bin");
        #[cfg(not(windows))]
        let bin_dir = dirs::home_dir()?.join(".local").join("bin");

        Some(Self {
            data_dir,
            cache_dir,
            bin_dir,
        })
    }

    /// Root every directory under `root` (for tests).
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            data_dir: root.join("data").join(APP_DIR),
            cache_dir: root.join("cache").join(APP_DIR),
            bin_dir: root.join("bin"),
        }
    }

    /// SQLite store file: `<data>/armory/user.db`.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("user.db")
    }

    /// Versioned payload directory for one installation:
    /// `<data>/armory/versions/<user_id>/<version>`.
    pub fn version_dir(&self, user_id: &str, version: &str) -> PathBuf {
        self.data_dir.join("versions").join(user_id).join(version)
    }

    /// Root of all payload directories for one binary.
    pub fn binary_versions_dir(&self, user_id: &str) -> PathBuf {
        self.data_dir.join("versions").join(user_id)
    }

    /// Cache location for a downloaded archive.
    pub fn cache_file(&self, asset_name: &str) -> PathBuf {
        self.cache_dir.join(asset_name)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Default bin directory for symlinks; per-binary `install_path`
    /// overrides take precedence over this.
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// The symlink path a binary would occupy under a given bin directory.
    pub fn symlink_for(bin_dir: &Path, link_name: &str) -> SymlinkPath {
        SymlinkPath::new(bin_dir.join(link_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn rooted_layout_keeps_everything_under_root() {
        let dir = tempdir().unwrap();
        let layout = Layout::rooted_at(dir.path());

        assert!(layout.db_path().starts_with(dir.path()));
        assert!(layout.version_dir("gh", "v1.0.0").starts_with(dir.path()));
        assert!(layout.cache_file("gh.tar.gz").starts_with(dir.path()));
        assert!(layout.bin_dir().starts_with(dir.path()));
    }

    #[test]
    fn version_dir_nests_user_id_then_version() {
        let layout = Layout::rooted_at(Path::new("/tmp/x"));
        let dir = layout.version_dir("gh", "v1.2.3");
        assert!(dir.ends_with("versions/gh/v1.2.3"));
    }
}
