//! Remove command

use std::io::{self, BufRead, Write};

use anyhow::Result;

use armory::ops;

/// Remove binaries from the catalogue; `--files` deletes payloads and the
/// symlink too.
pub fn remove(binaries: &[String], files: bool, yes: bool) -> Result<()> {
    let ctx = super::engine_context()?;

    for user_id in binaries {
        if !yes && !confirm(user_id, files)? {
            println!("skipped {user_id}");
            continue;
        }
        let report = ops::remove(&ctx, user_id, files)?;
        if report.files_removed {
            println!(
                "removed {} ({} installed version(s), files deleted)",
                report.user_id, report.installations_removed
            );
        } else {
            println!(
                "removed {} ({} installed version(s), files kept on disk)",
                report.user_id, report.installations_removed
            );
        }
    }
    Ok(())
}

fn confirm(user_id: &str, files: bool) -> Result<bool> {
    if files {
        print!("Remove '{user_id}' and delete its files? [y/N] ");
    } else {
        print!("Remove '{user_id}'? [y/N] ");
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes"))
}
