//! Adding a binary straight from a GitHub release asset URL.
//!
//! The URL shape is `https://github.com/{owner}/{repo}/releases/download/
//! {tag}/{asset}`. Everything the descriptor needs comes from those
//! segments; nothing is fetched at add time.

use crate::ops::{EngineContext, EngineError};
use crate::store::{Audit, Binary, BinaryDescriptor, BinarySource, StoreError};
use crate::types::ArchiveFormat;

/// The pieces of a GitHub release asset URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReleaseUrl {
    pub owner: String,
    pub repo: String,
    pub version: String,
    pub asset_name: String,
    pub format: ArchiveFormat,
}

impl ParsedReleaseUrl {
    pub fn parse(url: &str) -> Result<Self, EngineError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| EngineError::InvalidUrl(format!("{url}: {e}")))?;

        if parsed.host_str() != Some("github.com") {
            return Err(EngineError::InvalidUrl(format!(
                "{url}: not a github.com URL"
            )));
        }

        let segments: Vec<&str> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();
        if segments.len() < 6 || segments[2] != "releases" || segments[3] != "download" {
            return Err(EngineError::InvalidUrl(format!(
                "{url}: expected /<owner>/<repo>/releases/download/<tag>/<asset>"
            )));
        }

        let asset_name = segments[segments.len() - 1].to_string();
        let format = ArchiveFormat::detect(&asset_name)?;

        Ok(Self {
            owner: segments[0].to_string(),
            repo: segments[1].to_string(),
            version: segments[4].to_string(),
            asset_name,
            format,
        })
    }

    /// `{owner}/{repo}` as stored in the descriptor.
    pub fn provider_path(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// The binary name: the first `-`/`_` token of the asset name with its
    /// archive extension stripped. `ripgrep-14.1.0-x86_64.tar.gz` names
    /// `ripgrep`.
    pub fn binary_name(&self) -> String {
        let stem = ArchiveFormat::strip_extension(&self.asset_name);
        stem.split(['-', '_'])
            .next()
            .unwrap_or(stem)
            .to_string()
    }

    /// Rebuild the download URL from the parsed pieces.
    pub fn compose(&self) -> String {
        format!(
            "https://github.com/{}/{}/releases/download/{}/{}",
            self.owner, self.repo, self.version, self.asset_name
        )
    }
}

/// Register a binary from a release asset URL and return it together with
/// the version the URL names. An already-tracked binary is returned as-is;
/// callers typically follow up with an install of `parsed.version`.
pub fn add_from_url(
    ctx: &EngineContext,
    url: &str,
) -> Result<(Binary, ParsedReleaseUrl), EngineError> {
    let audit = Audit::start(&ctx.store, "add", &format!("add from {url}"))?;

    match add_inner(ctx, &audit, url) {
        Ok(result) => {
            audit.success(&ctx.store);
            Ok(result)
        }
        Err(e) => {
            audit.failure(&ctx.store, &e.to_string());
            Err(e.with_context(format!("add {url}")))
        }
    }
}

fn add_inner(
    ctx: &EngineContext,
    audit: &Audit,
    url: &str,
) -> Result<(Binary, ParsedReleaseUrl), EngineError> {
    let parsed = ParsedReleaseUrl::parse(url)?;
    let user_id = parsed.binary_name();

    match ctx.store.get_binary_by_user_id(&user_id) {
        Ok(existing) => {
            audit.entity(&ctx.store, "binary", existing.id);
            tracing::info!(binary = %existing.user_id, "already tracked");
            return Ok((existing, parsed));
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let descriptor = BinaryDescriptor {
        user_id: user_id.clone(),
        name: user_id.clone(),
        alias: None,
        provider: "github".to_string(),
        provider_path: parsed.provider_path(),
        asset_regex: None,
        tag_prefix: None,
        install_path: None,
        format: parsed.format,
        authenticated: false,
    };
    let binary = ctx
        .store
        .create_binary(&descriptor, BinarySource::Manual, 0)?;
    audit.entity(&ctx.store, "binary", binary.id);

    tracing::info!(
        binary = %binary.user_id,
        repo = %binary.provider_path,
        "added from url"
    );
    Ok((binary, parsed))
}
