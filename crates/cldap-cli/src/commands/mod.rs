//! CLI command implementations

pub mod configure;
pub mod login;
pub mod reset;
pub mod search;

use anyhow::{bail, Result};
use async_trait::async_trait;
use cldap_core::{ConfigStore, LdapConfig};
use cldap_directory::{Authentication, AuthenticationFailure, DirectoryClient};
use serde::Serialize;
use tracing::warn;

use crate::OutputFormat;

/// Context passed to all commands
pub struct CommandContext {
    pub store: ConfigStore,
    pub output_format: OutputFormat,
}

impl CommandContext {
    pub fn new(store: ConfigStore, output_format: OutputFormat) -> Self {
        Self {
            store,
            output_format,
        }
    }

    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print a value as pretty JSON
    pub fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    /// Load the stored configuration, failing unless `configure` has run.
    pub fn configured(&self) -> Result<LdapConfig> {
        let config = match self.store.load() {
            Ok(config) => config,
            Err(err) => bail!("Ldap client not configured. Kindly load configuration: {err}"),
        };
        if !config.is_configured() {
            bail!("Configurations for Ldap are missing. Run the configure command to load config");
        }
        Ok(config)
    }

    /// Load the stored configuration, failing unless a login has succeeded.
    pub fn logged_in(&self) -> Result<LdapConfig> {
        let config = self.configured()?;
        if !config.has_credentials() {
            bail!("You have not saved your user creds. Use the login command to save your creds");
        }
        Ok(config)
    }
}

/// Directory operations shared by the commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Directory: Send {
    /// Verify a user's password.
    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Authentication, AuthenticationFailure>;

    /// Release the connection.
    async fn close(&mut self) -> cldap_core::Result<()>;
}

#[async_trait]
impl Directory for DirectoryClient {
    async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Authentication, AuthenticationFailure> {
        DirectoryClient::authenticate(self, username, password).await
    }

    async fn close(&mut self) -> cldap_core::Result<()> {
        DirectoryClient::close(self).await
    }
}

/// Release the directory connection, logging instead of failing the command.
pub async fn disconnect<D: Directory + ?Sized>(client: &mut D) {
    if let Err(err) = client.close().await {
        warn!(error = %err, "failed to close directory connection");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use cldap_core::ClientConfig;
    use std::path::Path;

    pub fn context_in(dir: &Path) -> CommandContext {
        CommandContext::new(
            ConfigStore::at(dir.join("cldap-conf.yaml")),
            OutputFormat::Text,
        )
    }

    pub fn complete_config() -> LdapConfig {
        let mut config = LdapConfig::default();
        config.ldap.client = ClientConfig {
            base: "dc=example,dc=com".to_string(),
            bind_dn: "cn=readonly,dc=example,dc=com".to_string(),
            bind_password: "readonly".to_string(),
            group_filter: "(memberUid=%s)".to_string(),
            user_filter: "(uid=%s)".to_string(),
            host: "127.0.0.1".to_string(),
            port: 1,
            timeout: 1,
            attributes: vec!["cn".to_string()],
            ..ClientConfig::default()
        };
        config
    }
}
