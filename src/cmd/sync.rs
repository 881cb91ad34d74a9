//! Sync command

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use armory::config::{self, Config};

/// Reconcile the catalogue with `armory.toml`. Manual binaries are left
/// alone; config-sourced ones are created, updated, or deleted to match.
pub fn sync(config_path: Option<PathBuf>) -> Result<()> {
    let path = match config_path {
        Some(path) => path,
        None => config::default_path().context("could not resolve the user config directory")?,
    };
    if !path.exists() {
        bail!("no config file at {}", path.display());
    }

    let config = Config::load(&path)?;
    let mut ctx = super::engine_context()?;
    let report = ctx
        .store
        .sync_from_config(&config.binaries, config.version)?;

    println!(
        "synced config v{}: {} created, {} updated, {} unchanged, {} deleted",
        config.version, report.created, report.updated, report.unchanged, report.deleted
    );
    Ok(())
}
