//! configure command - load, validate and persist the LDAP configuration

use super::CommandContext;
use crate::ConfigureArgs;
use anyhow::{Context, Result};
use cldap_core::ConfigStore;
use tracing::info;

pub fn execute(ctx: &CommandContext, args: &ConfigureArgs) -> Result<()> {
    println!("path to config {}", args.config.display());

    let mut config = ConfigStore::import(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    ctx.store
        .save(&mut config)
        .context("Config file has errors")?;

    info!(source = %args.config.display(), "configuration imported");
    println!("Configuration saved to {}", ctx.store.path().display());
    Ok(())
}
