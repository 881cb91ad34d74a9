//! Update command

use anyhow::{Result, bail};

use armory::ops;

/// Update named binaries to their latest release, or all tracked binaries.
pub async fn update(binaries: &[String], all: bool) -> Result<()> {
    let ctx = super::engine_context()?;

    if all {
        let (outcomes, failures) = ops::update_all(&ctx).await?;
        for outcome in &outcomes {
            if outcome.already_installed {
                println!("{} {} (up to date)", outcome.binary.user_id, outcome.version);
            } else {
                println!("{} -> {}", outcome.binary.user_id, outcome.version);
            }
        }
        if !failures.is_empty() {
            for (user_id, err) in &failures {
                eprintln!("error: {user_id}: {err}");
            }
            bail!("{} of {} updates failed", failures.len(), outcomes.len() + failures.len());
        }
        return Ok(());
    }

    for user_id in binaries {
        let outcome = ops::update(&ctx, user_id).await?;
        if outcome.already_installed {
            println!("{} {} (up to date)", outcome.binary.user_id, outcome.version);
        } else {
            println!("{} -> {}", outcome.binary.user_id, outcome.version);
        }
    }
    Ok(())
}
