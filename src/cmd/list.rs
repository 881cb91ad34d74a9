//! List command

use anyhow::Result;

use armory::store::StoreError;

/// List catalogued binaries with their active and installed versions.
pub fn list() -> Result<()> {
    let ctx = super::engine_context()?;

    let binaries = ctx.store.list_binaries()?;
    if binaries.is_empty() {
        println!("No binaries tracked.");
        println!("Run 'armory sync' or 'armory add <release url>' to get started.");
        return Ok(());
    }

    for binary in binaries {
        let active = match ctx.store.get_active_with_installation(binary.id) {
            Ok(Some(row)) => Some(row.installation.version),
            Ok(None) | Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let installed: Vec<String> = ctx
            .store
            .list_installations(binary.id)?
            .into_iter()
            .map(|i| i.version)
            .collect();

        match active {
            Some(version) => println!(
                "{} {} [{}] ({})",
                binary.user_id,
                version,
                installed.join(", "),
                binary.source.as_str()
            ),
            None if installed.is_empty() => {
                println!("{} (not installed) ({})", binary.user_id, binary.source.as_str())
            }
            None => println!(
                "{} (inactive) [{}] ({})",
                binary.user_id,
                installed.join(", "),
                binary.source.as_str()
            ),
        }
    }
    Ok(())
}
