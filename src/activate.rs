//! Symlink activation.
//!
//! The symlink in the bin directory is the only cross-operation shared
//! mutable resource; all mutation of it lives here. Links always point at
//! an [`InstalledPath`] (the real payload), never at another symlink.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::layout::Layout;
use crate::store::Binary;
use crate::types::{InstalledPath, SymlinkPath};

#[derive(Error, Debug)]
pub enum ActivateError {
    #[error("failed to create bin directory {path}: {source}")]
    CreateBinDir { path: PathBuf, source: io::Error },

    #[error("failed to replace symlink {path}: {source}")]
    ReplaceLink { path: PathBuf, source: io::Error },

    #[error("failed to remove {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },
}

/// The bin directory for a binary: its `install_path` override when set,
/// otherwise the layout default.
pub fn bin_dir_for(layout: &Layout, binary: &Binary) -> PathBuf {
    match binary.install_path.as_deref() {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => layout.bin_dir().to_path_buf(),
    }
}

/// Point the user-visible symlink for `binary` at `target`, replacing
/// whatever occupied the link path. Returns the symlink path.
pub fn set_active(
    layout: &Layout,
    binary: &Binary,
    target: &InstalledPath,
) -> Result<SymlinkPath, ActivateError> {
    let bin_dir = bin_dir_for(layout, binary);
    fs::create_dir_all(&bin_dir).map_err(|source| ActivateError::CreateBinDir {
        path: bin_dir.clone(),
        source,
    })?;

    let link = Layout::symlink_for(&bin_dir, binary.link_name());
    remove_existing(link.as_path())?;

    make_symlink(target.as_path(), link.as_path()).map_err(|source| {
        ActivateError::ReplaceLink {
            path: link.as_path().to_path_buf(),
            source,
        }
    })?;

    tracing::debug!(link = %link, target = %target, "flipped symlink");
    Ok(link)
}

/// Remove the symlink (if any) and every version payload directory for a
/// binary. Used by `remove --files`.
pub fn remove_files(
    layout: &Layout,
    binary: &Binary,
    symlink: Option<&SymlinkPath>,
) -> Result<(), ActivateError> {
    if let Some(link) = symlink {
        remove_existing(link.as_path())?;
    }

    let versions_root = layout.binary_versions_dir(&binary.user_id);
    if versions_root.exists() {
        fs::remove_dir_all(&versions_root).map_err(|source| ActivateError::Remove {
            path: versions_root,
            source,
        })?;
    }
    Ok(())
}

/// Link-aware unlink: `symlink_metadata` sees the link itself, so dangling
/// symlinks are removed too.
fn remove_existing(path: &Path) -> Result<(), ActivateError> {
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path).map_err(|source| ActivateError::Remove {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ActivateError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(unix)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn make_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
