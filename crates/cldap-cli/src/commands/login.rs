//! login command - authenticate and remember the credentials

use super::{disconnect, CommandContext, Directory};
use crate::LoginArgs;
use anyhow::{Context, Result};
use cldap_directory::{DirectoryClient, UserAttributes};
use tracing::info;

pub async fn execute(ctx: &CommandContext, args: &LoginArgs) -> Result<()> {
    let config = ctx.configured()?;
    let mut client = DirectoryClient::new(config.ldap.client);
    login(ctx, args, &mut client).await
}

/// Authenticates through `directory` and stores the credentials only when that succeeds.
async fn login<D: Directory + ?Sized>(
    ctx: &CommandContext,
    args: &LoginArgs,
    directory: &mut D,
) -> Result<()> {
    let outcome = directory.authenticate(&args.username, &args.password).await;
    disconnect(directory).await;

    let auth = match outcome {
        Ok(auth) => auth,
        Err(failure) => {
            if let Some(attributes) = &failure.attributes {
                print_attributes(ctx, attributes)?;
            }
            return Err(failure.error).context("Error in authenticating user");
        }
    };

    ctx.store
        .save_credentials(&args.username, &args.password)
        .context("Authenticated, but failed to save credentials")?;
    info!(dn = %auth.dn, "login succeeded");

    if ctx.is_json() {
        ctx.print_json(&auth.attributes)?;
    } else {
        println!("Logged in as {}", auth.dn);
        print_attributes(ctx, &auth.attributes)?;
    }
    Ok(())
}

fn print_attributes(ctx: &CommandContext, attributes: &UserAttributes) -> Result<()> {
    if ctx.is_json() {
        return ctx.print_json(attributes);
    }
    for (name, value) in attributes.iter() {
        println!("  {name}: {value}");
    }
    Ok(())
}
