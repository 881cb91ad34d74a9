//! The install state machine.
//!
//! Side effects happen in a fixed order: archive written to cache, archive
//! verified, payload extracted, symlink flipped, store rows written. Every
//! step before extraction is free of filesystem mutation outside the cache,
//! so digest mismatches and resolution failures leave user state untouched.

use crate::activate;
use crate::io::{digest, download, extract};
use crate::ops::{EngineContext, EngineError};
use crate::resolver::{self, VersionSelector};
use crate::store::{Audit, Binary, Installation, NewInstallation, StoreError};

/// What an install produced.
#[derive(Debug)]
pub struct InstallOutcome {
    pub binary: Binary,
    pub installation: Installation,
    /// The effective version: the requested tag, or the release's
    /// `tag_name` when `latest` was requested.
    pub version: String,
    /// True when the `(binary, version)` pair was already installed and the
    /// operation short-circuited without touching the filesystem.
    pub already_installed: bool,
}

pub async fn install(
    ctx: &EngineContext,
    binary_user_id: &str,
    version: &str,
) -> Result<InstallOutcome, EngineError> {
    let audit = Audit::start(
        &ctx.store,
        "install",
        &format!("install {binary_user_id}@{version}"),
    )?;

    match install_inner(ctx, &audit, binary_user_id, version).await {
        Ok(outcome) => {
            audit.success(&ctx.store);
            Ok(outcome)
        }
        Err(e) => {
            audit.failure(&ctx.store, &e.to_string());
            Err(e.with_context(format!("install {binary_user_id}@{version}")))
        }
    }
}

async fn install_inner(
    ctx: &EngineContext,
    audit: &Audit,
    binary_user_id: &str,
    version: &str,
) -> Result<InstallOutcome, EngineError> {
    let binary = ctx.store.get_binary_by_user_id(binary_user_id)?;
    audit.entity(&ctx.store, "binary", binary.id);

    let token = download::provider_token(&binary.provider, binary.authenticated)?;

    // Resolve release metadata and pick one asset for this host.
    let selector = VersionSelector::parse(version);
    let (release, asset) = resolver::resolve(
        &ctx.providers,
        &ctx.client,
        token.as_deref(),
        &binary,
        &selector,
        &ctx.platform,
    )
    .await?;

    let effective_version = match &selector {
        VersionSelector::Latest => release.tag_name.clone(),
        VersionSelector::Tag(tag) => tag.clone(),
    };

    // Idempotence: an existing installation short-circuits before any
    // download or filesystem work.
    match ctx.store.get_installation(binary.id, &effective_version) {
        Ok(existing) => {
            tracing::info!(
                binary = %binary.user_id,
                version = %effective_version,
                "already installed"
            );
            return Ok(InstallOutcome {
                binary,
                installation: existing,
                version: effective_version,
                already_installed: true,
            });
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    // Fetch the archive into the cache.
    let cache_path = download::download(
        &ctx.client,
        &asset.browser_download_url,
        &asset.name,
        token.as_deref(),
        ctx.layout.cache_dir(),
    )
    .await?;
    let download_row = record_download(
        ctx,
        &binary,
        &effective_version,
        &cache_path,
        &asset.browser_download_url,
        asset.size,
    )?;

    // Verify the archive against the declared digest before any extraction.
    let archive_digest = match asset.digest.as_deref().filter(|d| !d.is_empty()) {
        Some(declared) => digest::verify_digest(&cache_path, declared)?,
        None => digest::hash_file(&cache_path)?,
    };
    if let Some(id) = download_row {
        ctx.store.mark_download_complete(id, archive_digest.as_str())?;
    }

    // Extract the one executable into the versioned payload directory.
    let dest_dir = ctx.layout.version_dir(&binary.user_id, &effective_version);
    let installed_path =
        extract::extract_binary(&cache_path, binary.format, &dest_dir, &binary.name)?;

    let payload_digest = digest::hash_file(installed_path.as_path())?;
    let file_size = std::fs::metadata(installed_path.as_path())
        .map(|m| m.len())
        .map_err(crate::io::extract::ExtractError::Io)?;

    // The only user-visible mutation: flip the symlink.
    let symlink = activate::set_active(&ctx.layout, &binary, &installed_path)?;

    // Record. A failure here retains the payload on disk; the next install
    // of the same version re-extracts over it cleanly.
    let installation = ctx.store.create_installation(&NewInstallation {
        binary_id: binary.id,
        version: &effective_version,
        installed_path: &installed_path,
        source_url: &asset.browser_download_url,
        file_size,
        checksum: payload_digest.as_str(),
    })?;
    ctx.store
        .set_active_version(binary.id, installation.id, &symlink)?;

    tracing::info!(
        binary = %binary.user_id,
        version = %effective_version,
        path = %installed_path,
        "installed"
    );

    Ok(InstallOutcome {
        binary,
        installation,
        version: effective_version,
        already_installed: false,
    })
}

/// Record (or touch) the cache row for this archive. Returns the row id to
/// mark complete after verification, or `None` when an existing complete
/// row was reused.
fn record_download(
    ctx: &EngineContext,
    binary: &Binary,
    version: &str,
    cache_path: &std::path::Path,
    source_url: &str,
    size: i64,
) -> Result<Option<i64>, EngineError> {
    let cache_str = cache_path.to_string_lossy();
    if let Some(existing) = ctx.store.get_download(binary.id, version)? {
        if existing.cache_path == cache_str {
            ctx.store.touch_download(existing.id)?;
            return Ok(Some(existing.id));
        }
    }
    match ctx.store.create_download(
        binary.id,
        version,
        &cache_str,
        source_url,
        size.max(0) as u64,
        None,
    ) {
        Ok(row) => Ok(Some(row.id)),
        // Same cache path recorded for another version tag; leave it be.
        Err(StoreError::Duplicate(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
