//! search command - look up user entries or group memberships

use super::{disconnect, CommandContext};
use crate::SearchArgs;
use anyhow::Result;
use cldap_directory::DirectoryClient;

pub async fn execute(ctx: &CommandContext, args: &SearchArgs) -> Result<()> {
    let config = ctx.logged_in()?;
    let mut client = DirectoryClient::new(config.ldap.client);

    let result = if let Some(username) = &args.entry {
        search_users(ctx, &mut client, username).await
    } else if let Some(username) = &args.group {
        search_groups(ctx, &mut client, username).await
    } else {
        Ok(())
    };

    disconnect(&mut client).await;
    result
}

async fn search_users(
    ctx: &CommandContext,
    client: &mut DirectoryClient,
    username: &str,
) -> Result<()> {
    let users = client
        .search_user(username)
        .await
        .map_err(|err| anyhow::anyhow!("Error searching user {username}, error: {err}"))?;

    if ctx.is_json() {
        return ctx.print_json(&users);
    }
    if users.is_empty() {
        println!("No users found matching {username}");
    }
    for user in &users {
        println!("{user}");
    }
    Ok(())
}

async fn search_groups(
    ctx: &CommandContext,
    client: &mut DirectoryClient,
    username: &str,
) -> Result<()> {
    let groups = client
        .get_user_groups(username)
        .await
        .map_err(|err| anyhow::anyhow!("Error search groups for user {username}, error: {err}"))?;

    if ctx.is_json() {
        return ctx.print_json(&groups);
    }
    let names: Vec<&str> = groups.iter().map(|group| group.name.as_str()).collect();
    println!(
        "User {username} is part of the following groups: [{}]",
        names.join(", ")
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{complete_config, context_in};
    use tempfile::tempdir;

    fn entry_search(username: &str) -> SearchArgs {
        SearchArgs {
            entry: Some(username.to_string()),
            group: None,
        }
    }

    #[tokio::test]
    async fn requires_configuration() {
        let dir = tempdir().unwrap();
        let ctx = context_in(dir.path());
        let err = execute(&ctx, &entry_search("alice")).await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn requires_login() {
        let dir = tempdir().unwrap();
        let ctx = context_in(dir.path());
        ctx.store.save(&mut complete_config()).unwrap();

        let err = execute(&ctx, &entry_search("alice")).await.unwrap_err();
        assert!(err.to_string().contains("login command"));
    }
}
