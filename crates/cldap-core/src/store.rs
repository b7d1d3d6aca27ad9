//! Persistence of the configuration file.
//!
//! Every operation touches exactly one file, `$HOME/.cldap/cldap-conf.yaml` by default.
//! Tests and the `--config-file` flag point the store elsewhere with [`ConfigStore::at`].

use crate::config::{Credentials, LdapConfig};
use crate::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Directory under the home directory holding the configuration.
pub const CONFIG_DIR_NAME: &str = ".cldap";
/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "cldap-conf.yaml";

/// Resolves the canonical configuration path for the current user.
///
/// # Errors
///
/// Returns [`Error::ConfigMissing`] if the home directory cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| Error::ConfigMissing("could not determine home directory".to_string()))?
        .home_dir()
        .to_path_buf();

    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Reads and writes the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Creates a store for the canonical path under the user's home directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the home directory cannot be determined.
    pub fn from_home() -> Result<Self> {
        Ok(Self::at(default_config_path()?))
    }

    /// Creates a store for an explicit file path.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the configuration file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the file is absent or unreadable and
    /// [`Error::ConfigDecode`] if it is malformed.
    pub fn load(&self) -> Result<LdapConfig> {
        read_config(&self.path)
    }

    /// Validates and persists the configuration, marking it as configured.
    ///
    /// The containing directory is created when missing. The file is replaced as a whole,
    /// never edited in place, and on unix is readable by its owner only since it holds
    /// passwords. `config` is marked configured only once the file has been written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming every empty mandatory field, or [`Error::Io`]
    /// when the file cannot be written.
    pub fn save(&self, config: &mut LdapConfig) -> Result<()> {
        config.ldap.client.check()?;

        let mut persisted = config.clone();
        persisted.ldap.client.configured = true;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let staging = self.staging_path();
        if let Err(err) = write_private(&staging, persisted.to_yaml()?.as_bytes())
            .and_then(|()| fs::rename(&staging, &self.path))
        {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }

        *config = persisted;
        info!(path = %self.path.display(), "saved cldap configuration");
        Ok(())
    }

    /// Loads a user-supplied configuration file without touching the store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] if the file cannot be read and
    /// [`Error::ConfigDecode`] if it is malformed.
    pub fn import(path: impl AsRef<Path>) -> Result<LdapConfig> {
        read_config(path.as_ref())
    }

    /// Records credentials from a successful login.
    ///
    /// The stored configuration is reloaded, updated and written back in one step so the
    /// persisted `has-creds` flag never disagrees with the stored username and password.
    ///
    /// # Errors
    ///
    /// Propagates any [`ConfigStore::load`] or [`ConfigStore::save`] failure.
    pub fn save_credentials(&self, username: &str, password: &str) -> Result<LdapConfig> {
        let mut config = self.load()?;
        config.ldap.creds = Credentials::new(username, password);
        self.save(&mut config)?;
        Ok(config)
    }

    /// True if the configuration file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// True if the configuration file exists, decodes and records a successful login.
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.exists() && self.load().is_ok_and(|config| config.has_credentials())
    }

    /// Removes the configuration file if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if an existing file cannot be removed.
    pub fn clean(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "removed cldap configuration");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Writes `content` to a freshly created file that only its owner can read.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != ErrorKind::NotFound => return Err(err),
        _ => {}
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.sync_all()
}

fn read_config(path: &Path) -> Result<LdapConfig> {
    debug!(path = %path.display(), "reading cldap configuration");
    let content = fs::read_to_string(path).map_err(|err| {
        Error::ConfigMissing(format!("cannot read {}: {err}", path.display()))
    })?;
    LdapConfig::from_yaml(&content)
}
