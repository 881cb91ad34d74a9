//! The declarative catalogue file, `armory.toml`.
//!
//! ```toml
//! version = 3
//!
//! [[binary]]
//! user_id = "rg"
//! name = "rg"
//! provider = "github"
//! provider_path = "BurntSushi/ripgrep"
//! format = ".tar.gz"
//! ```

use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::store::BinaryDescriptor;

pub const CONFIG_FILE: &str = "armory.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// The parsed catalogue: a generation counter plus binary descriptors.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default, rename = "binary")]
    pub binaries: Vec<BinaryDescriptor>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for desc in &self.binaries {
            if desc.user_id.is_empty() {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    reason: "binary with empty user_id".to_string(),
                });
            }
            if !seen.insert(desc.user_id.as_str()) {
                return Err(ConfigError::Invalid {
                    path: path.to_path_buf(),
                    reason: format!("duplicate user_id '{}'", desc.user_id),
                });
            }
        }
        Ok(())
    }
}

/// Default config location: `<config dir>/armory/armory.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(crate::layout::APP_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArchiveFormat;

    fn write_config(dir: &Path, text: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn parses_full_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            version = 3

            [[binary]]
            user_id = "rg"
            name = "rg"
            alias = "ripgrep"
            provider = "github"
            provider_path = "BurntSushi/ripgrep"
            asset_regex = "musl"
            tag_prefix = "v"
            format = ".tar.gz"
            authenticated = true
            "#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.version, 3);
        assert_eq!(config.binaries.len(), 1);
        let rg = &config.binaries[0];
        assert_eq!(rg.alias.as_deref(), Some("ripgrep"));
        assert_eq!(rg.format, ArchiveFormat::TarGz);
        assert!(rg.authenticated);
    }

    #[test]
    fn release_regex_is_accepted_for_tag_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            version = 1

            [[binary]]
            user_id = "gh"
            name = "gh"
            provider = "github"
            provider_path = "cli/cli"
            release_regex = "v"
            format = ".zip"
            "#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.binaries[0].tag_prefix.as_deref(), Some("v"));
    }

    #[test]
    fn empty_catalogue_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "version = 1\n");
        let config = Config::load(&path).unwrap();
        assert!(config.binaries.is_empty());
    }

    #[test]
    fn duplicate_user_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            version = 1

            [[binary]]
            user_id = "rg"
            name = "rg"
            provider = "github"
            provider_path = "a/b"
            format = ".tar.gz"

            [[binary]]
            user_id = "rg"
            name = "rg2"
            provider = "github"
            provider_path = "c/d"
            format = ".zip"
            "#,
        );
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn unparseable_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "version = [nope");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
