//! Use (switch) command

use anyhow::{Result, bail};

use armory::ops;

/// Switch the active version of a binary. Takes `name@version`.
pub fn use_binary(spec: &str) -> Result<()> {
    let Some((user_id, version)) = spec.split_once('@') else {
        bail!("expected <binary>@<version>, got '{spec}'");
    };
    if user_id.is_empty() || version.is_empty() {
        bail!("expected <binary>@<version>, got '{spec}'");
    }

    let ctx = super::engine_context()?;
    let installation = ops::switch(&ctx, user_id, version)?;
    println!("{} now points at {}", user_id, installation.version);
    Ok(())
}
