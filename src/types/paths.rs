//! Path newtypes for the two roles a binary path can play.
//!
//! `InstalledPath` is the extracted executable itself; `SymlinkPath` is the
//! name on `PATH` that points at it. The activator only ever links a
//! `SymlinkPath` to an `InstalledPath`, which rules out symlink-to-symlink
//! chains and self-cycles at the type level.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The on-disk path of an extracted executable payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstalledPath(PathBuf);

impl InstalledPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// The user-visible symlink in the bin directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymlinkPath(PathBuf);

impl SymlinkPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for InstalledPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for SymlinkPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for InstalledPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl std::fmt::Display for SymlinkPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}
