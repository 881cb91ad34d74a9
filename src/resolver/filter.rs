//! Asset selection for the host platform.
//!
//! Release authors spell platforms many ways (`x86_64` vs `amd64`,
//! `darwin` vs `macos` vs `osx`), so matching works on name-variation
//! tables rather than exact strings.

use regex::Regex;

use super::{Asset, ResolveError};
use crate::store::Binary;
use crate::types::{ArchiveFormat, Platform};

/// Preference order when several assets survive filtering.
const PREFERRED_EXTENSIONS: &[&str] = &[".tar.gz", ".tgz", ".zip", ".tar.xz", ".tar.bz2"];

/// The filters derived from a binary's descriptor and the host platform.
///
/// When `regex` is set it replaces the platform filters entirely; otherwise
/// filters apply in order: OS, architecture, extension.
#[derive(Debug)]
pub struct AssetFilter {
    extension: ArchiveFormat,
    regex: Option<Regex>,
    platform: Platform,
}

impl AssetFilter {
    pub fn for_binary(binary: &Binary, platform: &Platform) -> Result<Self, ResolveError> {
        let regex = match binary.asset_regex.as_deref() {
            Some(pattern) if !pattern.is_empty() => {
                Some(
                    Regex::new(pattern).map_err(|source| ResolveError::InvalidAssetRegex {
                        pattern: pattern.to_string(),
                        source,
                    })?,
                )
            }
            _ => None,
        };

        Ok(Self {
            extension: binary.format,
            regex,
            platform: platform.clone(),
        })
    }

    #[cfg(test)]
    pub fn for_platform(extension: ArchiveFormat, platform: Platform) -> Self {
        Self {
            extension,
            regex: None,
            platform,
        }
    }

    /// Pick exactly one asset, or fail with `NoMatchingAsset`.
    pub fn select<'a>(&self, assets: &'a [Asset]) -> Result<&'a Asset, ResolveError> {
        let survivors: Vec<&Asset> = if let Some(regex) = &self.regex {
            assets.iter().filter(|a| regex.is_match(&a.name)).collect()
        } else {
            assets
                .iter()
                .filter(|a| self.matches_os(&a.name))
                .filter(|a| self.matches_arch(&a.name))
                .filter(|a| self.matches_extension(&a.name))
                .collect()
        };

        match survivors.len() {
            0 => Err(ResolveError::NoMatchingAsset),
            1 => Ok(survivors[0]),
            _ => best_asset(&survivors).ok_or(ResolveError::NoMatchingAsset),
        }
    }

    fn matches_os(&self, asset_name: &str) -> bool {
        let name = asset_name.to_lowercase();
        self.platform.os_variations().iter().any(|variation| {
            // "win" appears inside "darwin"; never let it match such names.
            if *variation == "win" && name.contains("darwin") {
                return false;
            }
            name.contains(variation)
        })
    }

    fn matches_arch(&self, asset_name: &str) -> bool {
        let name = asset_name.to_lowercase();
        self.platform
            .arch_variations()
            .iter()
            .any(|variation| name.contains(variation))
    }

    /// Suffix match treating multi-part extensions as one suffix; `.tgz`
    /// counts as `.tar.gz`.
    fn matches_extension(&self, asset_name: &str) -> bool {
        let name = asset_name.to_lowercase();
        match self.extension {
            ArchiveFormat::TarGz => name.ends_with(".tar.gz") || name.ends_with(".tgz"),
            ArchiveFormat::Zip => name.ends_with(".zip"),
        }
    }
}

/// Break ties among surviving assets: first preferred extension class that
/// is populated, shortest name within it; shortest name overall when no
/// preferred extension is present.
fn best_asset<'a>(survivors: &[&'a Asset]) -> Option<&'a Asset> {
    for ext in PREFERRED_EXTENSIONS {
        if let Some(best) = survivors
            .iter()
            .filter(|a| a.name.to_lowercase().ends_with(ext))
            .min_by_key(|a| a.name.len())
        {
            return Some(*best);
        }
    }
    survivors.iter().min_by_key(|a| a.name.len()).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> Asset {
        Asset {
            id: 0,
            name: name.to_string(),
            content_type: None,
            size: 0,
            digest: None,
            browser_download_url: format!("https://example.com/{name}"),
        }
    }

    fn linux_amd64(extension: ArchiveFormat) -> AssetFilter {
        AssetFilter::for_platform(extension, Platform::new("linux", "amd64"))
    }

    #[test]
    fn prefers_tar_gz_over_tgz_and_zip() {
        let assets = vec![
            asset("tool-linux-amd64.zip"),
            asset("tool-linux-amd64.tar.gz"),
            asset("tool-linux-x86_64.tgz"),
        ];
        let chosen = linux_amd64(ArchiveFormat::TarGz).select(&assets).unwrap();
        assert_eq!(chosen.name, "tool-linux-amd64.tar.gz");
    }

    #[test]
    fn arch_variations_match_x86_64() {
        let assets = vec![
            asset("tool-linux-x86_64.tar.gz"),
            asset("tool-darwin-arm64.tar.gz"),
        ];
        let chosen = linux_amd64(ArchiveFormat::TarGz).select(&assets).unwrap();
        assert_eq!(chosen.name, "tool-linux-x86_64.tar.gz");
    }

    #[test]
    fn unknown_os_does_not_match_linux_assets() {
        let filter = AssetFilter::for_platform(
            ArchiveFormat::TarGz,
            Platform::new("freebsd", "riscv64"),
        );
        let assets = vec![asset("tool-linux-amd64.tar.gz")];
        assert!(matches!(
            filter.select(&assets),
            Err(ResolveError::NoMatchingAsset)
        ));
    }

    #[test]
    fn win_does_not_match_darwin() {
        let filter = AssetFilter::for_platform(
            ArchiveFormat::Zip,
            Platform::new("windows", "amd64"),
        );
        let assets = vec![asset("tool-darwin-amd64.zip")];
        assert!(matches!(
            filter.select(&assets),
            Err(ResolveError::NoMatchingAsset)
        ));
    }

    #[test]
    fn windows_matches_win_shorthand() {
        let filter = AssetFilter::for_platform(
            ArchiveFormat::Zip,
            Platform::new("windows", "amd64"),
        );
        let assets = vec![asset("tool-win-x64.zip"), asset("tool-linux-amd64.zip")];
        assert_eq!(filter.select(&assets).unwrap().name, "tool-win-x64.zip");
    }

    #[test]
    fn osx_counts_as_darwin() {
        let filter = AssetFilter::for_platform(
            ArchiveFormat::TarGz,
            Platform::new("darwin", "arm64"),
        );
        let assets = vec![asset("tool-osx-aarch64.tar.gz")];
        assert_eq!(filter.select(&assets).unwrap().name, "tool-osx-aarch64.tar.gz");
    }

    #[test]
    fn extension_filter_excludes_other_formats() {
        let assets = vec![
            asset("tool-linux-amd64.tar.xz"),
            asset("tool-linux-amd64.deb"),
        ];
        assert!(matches!(
            linux_amd64(ArchiveFormat::TarGz).select(&assets),
            Err(ResolveError::NoMatchingAsset)
        ));
    }

    #[test]
    fn shortest_name_breaks_ties() {
        let assets = vec![
            asset("tool-linux-amd64-musl-static.tar.gz"),
            asset("tool-linux-amd64.tar.gz"),
        ];
        let chosen = linux_amd64(ArchiveFormat::TarGz).select(&assets).unwrap();
        assert_eq!(chosen.name, "tool-linux-amd64.tar.gz");
    }

    #[test]
    fn regex_replaces_platform_filters() {
        let filter = AssetFilter {
            extension: ArchiveFormat::TarGz,
            regex: Some(Regex::new(r"musl").unwrap()),
            platform: Platform::new("linux", "amd64"),
        };
        let assets = vec![
            asset("tool-linux-amd64.tar.gz"),
            asset("tool-musl.tar.gz"),
        ];
        assert_eq!(filter.select(&assets).unwrap().name, "tool-musl.tar.gz");
    }

    #[test]
    fn single_match_needs_no_tie_break() {
        let assets = vec![asset("tool-linux-amd64.tar.gz")];
        assert_eq!(
            linux_amd64(ArchiveFormat::TarGz).select(&assets).unwrap().name,
            "tool-linux-amd64.tar.gz"
        );
    }
}
