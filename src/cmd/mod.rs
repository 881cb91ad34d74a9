//! Command modules - one file per CLI command

use anyhow::{Context, Result};

use armory::io::download;
use armory::layout::Layout;
use armory::ops::EngineContext;
use armory::resolver::ProviderRegistry;
use armory::store::Store;
use armory::types::Platform;

pub mod add;
pub mod check;
pub mod install;
pub mod list;
pub mod remove;
pub mod sync;
pub mod update;
pub mod r#use;

/// Build the engine context all commands run against.
pub fn engine_context() -> Result<EngineContext> {
    let layout = Layout::from_env()
        .context("could not resolve the user data and cache directories")?;
    let store = Store::open_at(&layout.db_path()).context("failed to open state database")?;
    let client = download::build_client().context("failed to build HTTP client")?;

    Ok(EngineContext::new(
        store,
        client,
        ProviderRegistry::new(),
        layout,
        Platform::host(),
    ))
}
