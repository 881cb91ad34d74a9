//! Install command

use anyhow::Result;

use armory::ops;

/// Install one or more binaries at a requested version (`latest` by default).
pub async fn install(binaries: &[String], version: &str) -> Result<()> {
    let ctx = super::engine_context()?;

    for user_id in binaries {
        let outcome = ops::install(&ctx, user_id, version).await?;
        if outcome.already_installed {
            println!(
                "{} {} is already installed",
                outcome.binary.user_id, outcome.version
            );
        } else {
            println!(
                "installed {} {} -> {}",
                outcome.binary.user_id, outcome.version, outcome.installation.installed_path
            );
        }
    }
    Ok(())
}
