//! Single-entry archive extraction.
//!
//! The extractor pulls exactly one executable out of an archive, matched by
//! basename. Archive-supplied paths are never interpreted as destination
//! paths: the output is always `<dest>/<name>` for the caller-chosen name,
//! which closes off path traversal by construction.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use thiserror::Error;
use zip::ZipArchive;

use crate::types::{ArchiveFormat, InstalledPath};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("invalid extraction arguments: {0}")]
    InvalidArguments(String),

    #[error("binary '{0}' not found in archive")]
    BinaryNotFoundInArchive(String),

    #[error("archive entry '{0}' is a symlink or hard link")]
    SymlinksNotAllowed(String),

    #[error("archive read error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Default mode for extracted executables when the archive records none.
const DEFAULT_EXEC_MODE: u32 = 0o755;

/// Extract the entry named `binary_name` (by basename) from `archive_path`
/// into `<dest_dir>/<binary_name>`, returning the payload path.
pub fn extract_binary(
    archive_path: &Path,
    format: ArchiveFormat,
    dest_dir: &Path,
    binary_name: &str,
) -> Result<InstalledPath, ExtractError> {
    if binary_name.is_empty() {
        return Err(ExtractError::InvalidArguments("empty binary name".to_string()));
    }
    if dest_dir.as_os_str().is_empty() {
        return Err(ExtractError::InvalidArguments("empty destination".to_string()));
    }

    fs::create_dir_all(dest_dir)?;
    let dest = dest_dir.join(binary_name);

    let mode = match format {
        ArchiveFormat::TarGz => extract_from_tar_gz(archive_path, &dest, binary_name)?,
        ArchiveFormat::Zip => extract_from_zip(archive_path, &dest, binary_name)?,
    };

    set_executable(&dest, mode)?;
    Ok(InstalledPath::new(dest))
}

/// Returns the recorded mode of the extracted entry.
fn extract_from_tar_gz(
    archive_path: &Path,
    dest: &Path,
    binary_name: &str,
) -> Result<u32, ExtractError> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut archive = tar::Archive::new(decoder);

    for entry in archive.entries().map_err(|e| ExtractError::Archive(e.to_string()))? {
        let mut entry = entry.map_err(|e| ExtractError::Archive(e.to_string()))?;
        let entry_path = entry
            .path()
            .map_err(|e| ExtractError::Archive(e.to_string()))?
            .into_owned();

        if basename(&entry_path) != Some(binary_name) {
            continue;
        }

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            return Err(ExtractError::SymlinksNotAllowed(
                entry_path.display().to_string(),
            ));
        }
        if !entry_type.is_file() {
            continue;
        }

        let mode = entry.header().mode().unwrap_or(0);
        let mut out = File::create(dest)?;
        io::copy(&mut entry, &mut out)?;
        return Ok(mode);
    }

    Err(ExtractError::BinaryNotFoundInArchive(binary_name.to_string()))
}

fn extract_from_zip(
    archive_path: &Path,
    dest: &Path,
    binary_name: &str,
) -> Result<u32, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;
        let entry_path = PathBuf::from(entry.name());

        if entry.is_dir() || basename(&entry_path) != Some(binary_name) {
            continue;
        }

        // Unix file type bits: 0o12 marks a symlink.
        if let Some(mode) = entry.unix_mode() {
            if mode & 0o170000 == 0o120000 {
                return Err(ExtractError::SymlinksNotAllowed(entry.name().to_string()));
            }
        }

        let mode = entry.unix_mode().unwrap_or(0);
        let mut out = File::create(dest)?;
        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        io::Write::write_all(&mut out, &buf)?;
        return Ok(mode);
    }

    Err(ExtractError::BinaryNotFoundInArchive(binary_name.to_string()))
}

fn basename(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Apply the entry's recorded mode, forcing 0755 when the archive recorded
/// none or no permission bits.
#[cfg(unix)]
fn set_executable(dest: &Path, recorded_mode: u32) -> Result<(), ExtractError> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if recorded_mode & 0o777 == 0 {
        DEFAULT_EXEC_MODE
    } else {
        recorded_mode & 0o7777
    };
    fs::set_permissions(dest, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_executable(_dest: &Path, _recorded_mode: u32) -> Result<(), ExtractError> {
    Ok(())
}
