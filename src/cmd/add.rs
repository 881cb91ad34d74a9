//! Add command

use anyhow::Result;

use armory::ops;

/// Register a binary from a GitHub release asset URL, then install the
/// version the URL names (unless `--no-install`).
pub async fn add(url: &str, no_install: bool) -> Result<()> {
    let ctx = super::engine_context()?;

    let (binary, parsed) = ops::add_from_url(&ctx, url)?;
    println!("tracking {} ({})", binary.user_id, binary.provider_path);

    if no_install {
        return Ok(());
    }

    let outcome = ops::install(&ctx, &binary.user_id, &parsed.version).await?;
    println!(
        "installed {} {} -> {}",
        outcome.binary.user_id, outcome.version, outcome.installation.installed_path
    );
    Ok(())
}
