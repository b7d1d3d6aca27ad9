//! reset command - remove stored configuration and credentials

use super::CommandContext;
use anyhow::Result;

pub fn execute(ctx: &CommandContext) -> Result<()> {
    let existed = ctx.store.exists();
    ctx.store.clean()?;
    if existed {
        println!("Removed {}", ctx.store.path().display());
    } else {
        println!("Nothing to remove at {}", ctx.store.path().display());
    }
    Ok(())
}
