//! Binary removal.

use crate::activate;
use crate::ops::{EngineContext, EngineError};
use crate::store::{Audit, StoreError};

/// What a removal touched.
#[derive(Debug)]
pub struct RemoveReport {
    pub user_id: String,
    /// Installation rows deleted alongside the binary.
    pub installations_removed: usize,
    /// True when the symlink and payload directories were deleted too.
    pub files_removed: bool,
}

/// Delete a binary's rows; with `remove_files`, also unlink its symlink and
/// delete every version payload directory. Installations, the active row,
/// and cache rows go with the binary via foreign-key cascade.
pub fn remove(
    ctx: &EngineContext,
    binary_user_id: &str,
    remove_files: bool,
) -> Result<RemoveReport, EngineError> {
    let audit = Audit::start(
        &ctx.store,
        "remove",
        &format!("remove {binary_user_id} (files: {remove_files})"),
    )?;

    match remove_inner(ctx, &audit, binary_user_id, remove_files) {
        Ok(report) => {
            audit.success(&ctx.store);
            Ok(report)
        }
        Err(e) => {
            audit.failure(&ctx.store, &e.to_string());
            Err(e.with_context(format!("remove {binary_user_id}")))
        }
    }
}

fn remove_inner(
    ctx: &EngineContext,
    audit: &Audit,
    binary_user_id: &str,
    remove_files: bool,
) -> Result<RemoveReport, EngineError> {
    let binary = ctx.store.get_binary_by_user_id(binary_user_id)?;
    audit.entity(&ctx.store, "binary", binary.id);

    let installations = ctx.store.list_installations(binary.id)?;
    let symlink = match ctx.store.get_active_version(binary.id) {
        Ok(Some(active)) => Some(active.symlink_path),
        Ok(None) | Err(StoreError::NotFound(_)) => None,
        Err(e) => return Err(e.into()),
    };

    if remove_files {
        activate::remove_files(&ctx.layout, &binary, symlink.as_ref())?;
    }

    ctx.store.delete_binary(binary.id)?;

    tracing::info!(
        binary = %binary.user_id,
        installations = installations.len(),
        files = remove_files,
        "removed"
    );
    Ok(RemoveReport {
        user_id: binary.user_id,
        installations_removed: installations.len(),
        files_removed: remove_files,
    })
}
