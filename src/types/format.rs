use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("unsupported archive format: {0}")]
pub struct UnsupportedFormat(pub String);

/// Archive formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    #[serde(rename = ".tar.gz")]
    TarGz,
    #[serde(rename = ".zip")]
    Zip,
}

impl ArchiveFormat {
    /// The canonical extension, with leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::TarGz => ".tar.gz",
            Self::Zip => ".zip",
        }
    }

    pub fn parse(s: &str) -> Result<Self, UnsupportedFormat> {
        match s {
            ".tar.gz" | "tar.gz" => Ok(Self::TarGz),
            ".zip" | "zip" => Ok(Self::Zip),
            other => Err(UnsupportedFormat(other.to_string())),
        }
    }

    /// Detect the format from an asset filename. `.tgz` is folded into
    /// `.tar.gz`.
    pub fn detect(asset_name: &str) -> Result<Self, UnsupportedFormat> {
        let lower = asset_name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Ok(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Ok(Self::Zip)
        } else {
            Err(UnsupportedFormat(asset_name.to_string()))
        }
    }

    /// Strip this format's extension from an asset name, if present.
    pub fn strip_extension(asset_name: &str) -> &str {
        for ext in [".tar.gz", ".tgz", ".zip"] {
            if let Some(stripped) = asset_name.strip_suffix(ext) {
                return stripped;
            }
        }
        asset_name
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
