//! Content verification.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::types::Sha256Digest;
use crate::types::digest::DigestError;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch {
        expected: Sha256Digest,
        actual: Sha256Digest,
    },

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("failed to hash {path}: {source}")]
    Read {
        path: String,
        source: io::Error,
    },
}

/// SHA-256 of a file's contents, streamed in 64 KiB chunks.
pub fn hash_file(path: &Path) -> Result<Sha256Digest, VerifyError> {
    let read_err = |source| VerifyError::Read {
        path: path.display().to_string(),
        source,
    };

    let mut file = File::open(path).map_err(read_err)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(read_err)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Sha256Digest::from_bytes(&hasher.finalize().into()))
}

/// Verify a file against a declared `<algorithm>:<hex>` digest. The
/// algorithm prefix is mandatory and only `sha256` is accepted.
pub fn verify_digest(path: &Path, declared: &str) -> Result<Sha256Digest, VerifyError> {
    let expected = Sha256Digest::parse_wire(declared)?;
    let actual = hash_file(path)?;
    if actual != expected {
        return Err(VerifyError::DigestMismatch { expected, actual });
    }
    Ok(actual)
}
