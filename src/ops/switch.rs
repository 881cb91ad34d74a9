//! Switching between already-installed versions.

use crate::activate;
use crate::ops::{EngineContext, EngineError};
use crate::store::{Audit, Installation, StoreError};

/// Point the symlink at an installed version. Fails without touching the
/// filesystem when the version has never been installed; nothing here
/// reaches for the network.
pub fn switch(
    ctx: &EngineContext,
    binary_user_id: &str,
    version: &str,
) -> Result<Installation, EngineError> {
    let audit = Audit::start(
        &ctx.store,
        "switch",
        &format!("switch {binary_user_id} to {version}"),
    )?;

    match switch_inner(ctx, &audit, binary_user_id, version) {
        Ok(installation) => {
            audit.success(&ctx.store);
            Ok(installation)
        }
        Err(e) => {
            audit.failure(&ctx.store, &e.to_string());
            Err(e.with_context(format!("switch {binary_user_id} to {version}")))
        }
    }
}

fn switch_inner(
    ctx: &EngineContext,
    audit: &Audit,
    binary_user_id: &str,
    version: &str,
) -> Result<Installation, EngineError> {
    let binary = ctx.store.get_binary_by_user_id(binary_user_id)?;
    audit.entity(&ctx.store, "binary", binary.id);

    let installation = match ctx.store.get_installation(binary.id, version) {
        Ok(row) => row,
        Err(StoreError::NotFound(_)) => {
            return Err(EngineError::VersionNotInstalled {
                user_id: binary.user_id,
                version: version.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let symlink = activate::set_active(&ctx.layout, &binary, &installation.installed_path)?;
    ctx.store
        .set_active_version(binary.id, installation.id, &symlink)?;

    tracing::info!(
        binary = %binary.user_id,
        version = %installation.version,
        "switched"
    );
    Ok(installation)
}
