//! Update and update-check operations.
//!
//! `update` is install-latest: the install path already short-circuits when
//! the latest tag is on disk, so no separate freshness machinery is needed.
//! `check` resolves metadata only and never downloads.

use crate::io::download;
use crate::ops::install::{self, InstallOutcome};
use crate::ops::{EngineContext, EngineError};
use crate::resolver::{self, VersionSelector};
use crate::store::StoreError;

/// Result of a metadata-only freshness check for one binary.
#[derive(Debug)]
pub enum CheckOutcome {
    UpToDate { version: String },
    UpdateAvailable { current: String, latest: String },
    NotInstalled { latest: String },
}

pub async fn update(
    ctx: &EngineContext,
    binary_user_id: &str,
) -> Result<InstallOutcome, EngineError> {
    install::install(ctx, binary_user_id, "latest").await
}

/// Update every tracked binary. A failure on one binary is collected, not
/// fatal: the remaining binaries still get their turn.
pub async fn update_all(
    ctx: &EngineContext,
) -> Result<(Vec<InstallOutcome>, Vec<(String, EngineError)>), EngineError> {
    let binaries = ctx.store.list_binaries()?;
    let mut outcomes = Vec::new();
    let mut failures = Vec::new();

    for binary in binaries {
        match update(ctx, &binary.user_id).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::warn!(binary = %binary.user_id, error = %e, "update failed");
                failures.push((binary.user_id, e));
            }
        }
    }
    Ok((outcomes, failures))
}

/// Compare the active version against the latest upstream release without
/// downloading anything.
pub async fn check(
    ctx: &EngineContext,
    binary_user_id: &str,
) -> Result<CheckOutcome, EngineError> {
    let binary = ctx.store.get_binary_by_user_id(binary_user_id)?;
    let token = download::provider_token(&binary.provider, binary.authenticated)?;

    let (release, _asset) = resolver::resolve(
        &ctx.providers,
        &ctx.client,
        token.as_deref(),
        &binary,
        &VersionSelector::Latest,
        &ctx.platform,
    )
    .await?;
    let latest = release.tag_name;

    let active = match ctx.store.get_active_with_installation(binary.id) {
        Ok(Some(row)) => row,
        Ok(None) => return Ok(CheckOutcome::NotInstalled { latest }),
        Err(StoreError::NotFound(_)) => return Ok(CheckOutcome::NotInstalled { latest }),
        Err(e) => return Err(e.into()),
    };

    let current = active.installation.version;
    if current == latest {
        Ok(CheckOutcome::UpToDate { version: current })
    } else {
        Ok(CheckOutcome::UpdateAvailable { current, latest })
    }
}

/// Check every tracked binary, collecting per-binary failures.
pub async fn check_all(
    ctx: &EngineContext,
) -> Result<Vec<(String, Result<CheckOutcome, EngineError>)>, EngineError> {
    let binaries = ctx.store.list_binaries()?;
    let mut results = Vec::new();
    for binary in binaries {
        let outcome = check(ctx, &binary.user_id).await;
        if let Err(e) = &outcome {
            tracing::warn!(binary = %binary.user_id, error = %e, "check failed");
        }
        results.push((binary.user_id, outcome));
    }
    Ok(results)
}
