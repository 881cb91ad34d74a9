//! Check command

use anyhow::Result;

use armory::ops::{self, CheckOutcome};

/// Report whether binaries are behind their latest upstream release.
/// Metadata only, no downloads.
pub async fn check(binaries: &[String], all: bool) -> Result<()> {
    let ctx = super::engine_context()?;

    if all {
        for (user_id, result) in ops::check_all(&ctx).await? {
            match result {
                Ok(outcome) => print_outcome(&user_id, &outcome),
                Err(e) => eprintln!("error: {user_id}: {e}"),
            }
        }
        return Ok(());
    }

    for user_id in binaries {
        let outcome = ops::check(&ctx, user_id).await?;
        print_outcome(user_id, &outcome);
    }
    Ok(())
}

fn print_outcome(user_id: &str, outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::UpToDate { version } => {
            println!("{user_id} {version} (up to date)");
        }
        CheckOutcome::UpdateAvailable { current, latest } => {
            println!("{user_id} {current} -> {latest} available");
        }
        CheckOutcome::NotInstalled { latest } => {
            println!("{user_id} not installed (latest is {latest})");
        }
    }
}
