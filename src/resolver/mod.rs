//! Upstream release resolution.
//!
//! Translates `(Binary, version selector)` into a concrete release and
//! exactly one asset chosen for the host platform.

pub mod filter;
pub mod github;

pub use github::GithubProvider;

use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::store::Binary;
use crate::types::Platform;
use filter::AssetFilter;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("invalid binary config: {0}")]
    InvalidBinaryConfig(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error("upstream returned non-JSON content: {0}")]
    UpstreamContent(String),

    #[error("release has no assets")]
    NoAssetsAvailable,

    #[error("no asset matches the current platform filters")]
    NoMatchingAsset,

    #[error("invalid asset regex '{pattern}': {source}")]
    InvalidAssetRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// A release as consumed from the provider API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub name: Option<String>,
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// One downloadable file attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: i64,
    /// Wire format `sha256:<hex>` when present; parsed lazily so a release
    /// with a malformed digest on an unrelated asset still resolves.
    #[serde(default)]
    pub digest: Option<String>,
    pub browser_download_url: String,
}

/// Which upstream release to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    Latest,
    Tag(String),
}

impl VersionSelector {
    /// `"latest"` is the reserved selector; everything else is a tag.
    pub fn parse(version: &str) -> Self {
        if version == "latest" {
            Self::Latest
        } else {
            Self::Tag(version.to_string())
        }
    }
}

/// In-process provider registry. One provider today; the seam exists so a
/// second forge is a new variant, not a plugin system.
pub enum Provider {
    Github(GithubProvider),
}

impl Provider {
    pub async fn fetch_release(
        &self,
        client: &reqwest::Client,
        token: Option<&str>,
        provider_path: &str,
        selector: &VersionSelector,
        tag_prefix: Option<&str>,
    ) -> Result<Release, ResolveError> {
        match self {
            Self::Github(github) => {
                github
                    .fetch_release(client, token, provider_path, selector, tag_prefix)
                    .await
            }
        }
    }
}

pub struct ProviderRegistry {
    providers: HashMap<&'static str, Provider>,
}

impl ProviderRegistry {
    /// The default registry: GitHub against its public API.
    pub fn new() -> Self {
        Self::with_github(GithubProvider::default())
    }

    /// Registry with a custom GitHub base URL (tests point this at a mock
    /// server).
    pub fn with_github(github: GithubProvider) -> Self {
        let mut providers = HashMap::new();
        providers.insert("github", Provider::Github(github));
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Result<&Provider, ResolveError> {
        self.providers
            .get(name)
            .ok_or_else(|| ResolveError::UnsupportedProvider(name.to_string()))
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the release and the single matching asset for `binary`.
pub async fn resolve(
    registry: &ProviderRegistry,
    client: &reqwest::Client,
    token: Option<&str>,
    binary: &Binary,
    selector: &VersionSelector,
    platform: &Platform,
) -> Result<(Release, Asset), ResolveError> {
    if binary.provider_path.is_empty() {
        return Err(ResolveError::InvalidBinaryConfig(format!(
            "binary '{}' has no provider path",
            binary.user_id
        )));
    }

    let provider = registry.get(&binary.provider)?;
    let release = provider
        .fetch_release(
            client,
            token,
            &binary.provider_path,
            selector,
            binary.tag_prefix.as_deref(),
        )
        .await?;

    if release.assets.is_empty() {
        return Err(ResolveError::NoAssetsAvailable);
    }

    let asset_filter = AssetFilter::for_binary(binary, platform)?;
    let asset = asset_filter.select(&release.assets)?.clone();

    tracing::debug!(
        binary = %binary.user_id,
        tag = %release.tag_name,
        asset = %asset.name,
        "resolved release asset"
    );

    Ok((release, asset))
}
