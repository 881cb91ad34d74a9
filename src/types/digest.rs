use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DigestError {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("digest '{0}' has no algorithm prefix")]
    MissingAlgorithm(String),

    #[error("invalid sha256 digest: expected 64 hex characters, got '{0}'")]
    InvalidHex(String),
}

/// A validated SHA-256 digest (64 lowercase hex characters).
///
/// The wire format for release assets is `sha256:<hex>`; the algorithm name
/// is matched case-insensitively and anything other than `sha256` is
/// rejected. Parsing at the boundary keeps malformed hex strings from
/// propagating into the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Parse a digest, accepting bare hex or the `sha256:<hex>` wire form.
    pub fn parse(s: &str) -> Result<Self, DigestError> {
        let hex = match s.split_once(':') {
            Some((algo, rest)) => {
                if !algo.eq_ignore_ascii_case("sha256") {
                    return Err(DigestError::UnsupportedAlgorithm(algo.to_string()));
                }
                rest
            }
            None => s,
        };

        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestError::InvalidHex(s.to_string()));
        }

        Ok(Self(hex.to_lowercase()))
    }

    /// Parse the wire form only: the `<algorithm>:<hex>` prefix is
    /// mandatory. Declared asset digests use this; bare hex is reserved for
    /// values this crate hashed itself.
    pub fn parse_wire(s: &str) -> Result<Self, DigestError> {
        if !s.contains(':') {
            return Err(DigestError::MissingAlgorithm(s.to_string()));
        }
        Self::parse(s)
    }

    /// Wrap raw SHA-256 output bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `sha256:<hex>` wire form.
    pub fn to_wire(&self) -> String {
        format!("sha256:{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
