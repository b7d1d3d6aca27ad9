//! Directory client implementation.

use crate::{
    filter::build_filter,
    group::Group,
    user::{User, UserAttributes},
    Result,
};
use async_trait::async_trait;
use cldap_core::{ClientConfig, Error};
use ldap3::{DerefAliases, LdapConnAsync, LdapConnSettings, Scope, SearchEntry, SearchOptions};
use native_tls::{Certificate, Identity, TlsConnector};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Attribute always requested alongside the configured ones.
const DN_ATTRIBUTE: &str = "dn";
const GROUP_NAME_ATTRIBUTE: &str = "cn";

/// LDAP entry representation used by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Attribute map (values preserved order from server).
    pub attributes: HashMap<String, Vec<String>>,
}

impl LdapEntry {
    /// Returns the first value of the attribute if present.
    ///
    /// Attribute names are matched case-insensitively, as LDAP does.
    #[must_use]
    pub fn first(&self, attribute: &str) -> Option<&str> {
        self.values(attribute)
            .and_then(|values| values.first().map(String::as_str))
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, attribute: &str) -> Option<&[String]> {
        self.attributes
            .get(attribute)
            .or_else(|| {
                self.attributes
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(attribute))
                    .map(|(_, values)| values)
            })
            .map(Vec::as_slice)
    }
}

/// A successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    /// DN the user was bound as.
    pub dn: String,
    /// Configured attributes of the user entry.
    pub attributes: UserAttributes,
}

/// A failed authentication.
///
/// `attributes` is populated when the user entry was found but a later bind failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct AuthenticationFailure {
    /// Cause of the failure.
    pub error: Error,
    /// Attributes extracted before the failure, if the search step succeeded.
    pub attributes: Option<UserAttributes>,
}

impl AuthenticationFailure {
    fn with_attributes(error: Error, attributes: &UserAttributes) -> Self {
        Self {
            error,
            attributes: Some(attributes.clone()),
        }
    }
}

impl From<Error> for AuthenticationFailure {
    fn from(error: Error) -> Self {
        Self {
            error,
            attributes: None,
        }
    }
}

impl From<AuthenticationFailure> for Error {
    fn from(failure: AuthenticationFailure) -> Self {
        failure.error
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapSession: Send {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;
    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<LdapEntry>>;
    async fn unbind(&mut self) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait LdapConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn LdapSession>>;
}

/// Directory client holding at most one live connection.
///
/// The client lives for a single command; call [`DirectoryClient::close`] when done.
pub struct DirectoryClient {
    config: Arc<ClientConfig>,
    connector: Box<dyn LdapConnector>,
    session: Option<Box<dyn LdapSession>>,
}

impl DirectoryClient {
    /// Creates a client that uses the real LDAP connector.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let config = Arc::new(config);
        let connector: Box<dyn LdapConnector> = Box::new(RealLdapConnector::new(config.clone()));
        Self {
            config,
            connector,
            session: None,
        }
    }

    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_connector(config: ClientConfig, connector: Box<dyn LdapConnector>) -> Self {
        Self {
            config: Arc::new(config),
            connector,
            session: None,
        }
    }

    /// True while a connection is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Opens the connection unless one is already held.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if dialing or the TLS handshake fails.
    pub async fn connect(&mut self) -> Result<()> {
        if self.session.is_none() {
            let session = self.connector.connect().await?;
            self.session = Some(session);
        }
        Ok(())
    }

    /// Verifies a user's password against the directory.
    ///
    /// The service account (when configured) locates the user entry, the entry's DN is then
    /// bound with `password`, and finally the service account is bound again so the
    /// connection is left in its read-only state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no entry matches, [`Error::AmbiguousMatch`] when
    /// several do, and [`Error::Bind`] when a bind is rejected. Failures after the search
    /// step carry the extracted attributes.
    pub async fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> std::result::Result<Authentication, AuthenticationFailure> {
        let config = Arc::clone(&self.config);
        self.bind_service_account().await?;

        let filter = build_filter(&config.user_filter, username);
        let mut entries = self.search_base(&filter, user_attributes(&config)).await?;
        let entry = match entries.len() {
            0 => {
                return Err(Error::NotFound(format!("no users found matching {filter}")).into())
            }
            1 => entries.remove(0),
            count => return Err(Error::AmbiguousMatch { filter, count }.into()),
        };

        let attributes = UserAttributes::from_entry(&entry, &config.attributes);

        // An empty password would turn the bind into an unauthenticated one.
        if password.is_empty() {
            return Err(AuthenticationFailure::with_attributes(
                Error::Bind("password must not be empty".to_string()),
                &attributes,
            ));
        }

        debug!(dn = %entry.dn, "binding as user");
        self.bind(&entry.dn, password)
            .await
            .map_err(|err| AuthenticationFailure::with_attributes(err, &attributes))?;

        if config.has_service_account() && !config.bind_password.is_empty() {
            self.bind(&config.bind_dn, &config.bind_password)
                .await
                .map_err(|err| AuthenticationFailure::with_attributes(err, &attributes))?;
        }

        Ok(Authentication {
            dn: entry.dn,
            attributes,
        })
    }

    /// Searches user entries matching `username`.
    ///
    /// Zero or many matches are both valid results.
    ///
    /// # Errors
    ///
    /// Returns connection, bind or directory errors.
    pub async fn search_user(&mut self, username: &str) -> Result<Vec<User>> {
        let config = Arc::clone(&self.config);
        self.bind_service_account().await?;

        let filter = build_filter(&config.user_filter, username);
        let entries = self.search_base(&filter, user_attributes(&config)).await?;

        Ok(entries
            .iter()
            .map(|entry| User::from_entry(entry, username, &config.attributes))
            .collect())
    }

    /// Lists the groups matching the group filter for `username`.
    ///
    /// # Errors
    ///
    /// Returns connection, bind or directory errors.
    pub async fn get_user_groups(&mut self, username: &str) -> Result<Vec<Group>> {
        let config = Arc::clone(&self.config);
        self.bind_service_account().await?;

        let filter = build_filter(&config.group_filter, username);
        let entries = self
            .search_base(&filter, vec![GROUP_NAME_ATTRIBUTE.to_string()])
            .await?;

        Ok(entries
            .into_iter()
            .filter_map(|entry| match entry.first(GROUP_NAME_ATTRIBUTE) {
                Some(name) => Some(Group::new(name, entry.dn.as_str())),
                None => {
                    warn!(dn = %entry.dn, "skipping group entry without a common name");
                    None
                }
            })
            .collect())
    }

    /// Releases the connection. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the unbind error; the connection is dropped either way.
    pub async fn close(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.unbind().await,
            None => Ok(()),
        }
    }

    async fn session(&mut self) -> Result<&mut Box<dyn LdapSession>> {
        self.connect().await?;
        self.session
            .as_mut()
            .ok_or_else(|| Error::Connection("connection is not open".to_string()))
    }

    async fn bind_service_account(&mut self) -> Result<()> {
        let config = Arc::clone(&self.config);
        if config.has_service_account() {
            debug!(dn = %config.bind_dn, "binding service account");
            self.bind(&config.bind_dn, &config.bind_password).await
        } else {
            self.connect().await
        }
    }

    async fn bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let limit = self.config.timeout();
        let session = self.session().await?;
        timeout(limit, session.simple_bind(dn, password))
            .await
            .map_err(|_| Error::Timeout("LDAP bind timed out".to_string()))?
    }

    async fn search_base(
        &mut self,
        filter: &str,
        attributes: Vec<String>,
    ) -> Result<Vec<LdapEntry>> {
        let config = Arc::clone(&self.config);
        debug!(base = %config.base, filter, ?attributes, "searching directory");
        let session = self.session().await?;
        timeout(
            config.timeout(),
            session.search(&config.base, filter, &attributes),
        )
        .await
        .map_err(|_| Error::Timeout("LDAP search timed out".to_string()))?
    }
}

fn user_attributes(config: &ClientConfig) -> Vec<String> {
    let mut attributes = config.attributes.clone();
    attributes.push(DN_ATTRIBUTE.to_string());
    attributes
}

/// Real LDAP connector backed by `ldap3`.
pub struct RealLdapConnector {
    config: Arc<ClientConfig>,
}

impl RealLdapConnector {
    /// Creates a new connector instance.
    #[must_use]
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LdapConnector for RealLdapConnector {
    async fn connect(&self) -> Result<Box<dyn LdapSession>> {
        let settings = build_ldap_settings(&self.config)?;
        let url = self.config.url()?;
        debug!(%url, "connecting to directory");
        let (conn, ldap) = LdapConnAsync::with_settings(settings, url.as_str())
            .await
            .map_err(|err| Error::Connection(format!("{url}: {err}")))?;
        ldap3::drive!(conn);
        Ok(Box::new(RealLdapSession { inner: ldap }))
    }
}

struct RealLdapSession {
    inner: ldap3::Ldap,
}

#[async_trait]
impl LdapSession for RealLdapSession {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let result = self
            .inner
            .simple_bind(dn, password)
            .await
            .map_err(|err| Error::directory("bind", err))?;
        result
            .success()
            .map_err(|err| Error::Bind(format!("{dn}: {err}")))?;
        Ok(())
    }

    async fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attributes: &[String],
    ) -> Result<Vec<LdapEntry>> {
        let result = self
            .inner
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .search(base_dn, Scope::Subtree, filter, attributes.to_vec())
            .await
            .map_err(|err| Error::directory("search", err))?;
        let (entries, _) = result
            .success()
            .map_err(|err| Error::directory("search", err))?;
        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| LdapEntry {
                dn: entry.dn,
                attributes: entry.attrs,
            })
            .collect())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.inner
            .unbind()
            .await
            .map_err(|err| Error::directory("unbind", err))
    }
}

fn build_ldap_settings(config: &ClientConfig) -> Result<LdapConnSettings> {
    let mut settings = LdapConnSettings::new().set_conn_timeout(config.timeout());

    if !config.use_ssl {
        return Ok(settings);
    }

    let mut builder = TlsConnector::builder();
    if config.skip_verify {
        builder.danger_accept_invalid_certs(true);
        settings = settings.set_no_tls_verify(true);
    } else if let Some(cert_path) = &config.ca_cert {
        let certificate = Certificate::from_pem(&read_pem(cert_path, "CA certificate")?)
            .map_err(|err| Error::Connection(format!("invalid CA certificate: {err}")))?;
        builder.add_root_certificate(certificate);
    }
    if let Some(identity) = client_identity(config)? {
        builder.identity(identity);
    }

    let connector = builder
        .build()
        .map_err(|err| Error::Connection(format!("failed to construct TLS connector: {err}")))?;
    Ok(settings.set_connector(connector))
}

/// Loads the client certificate and key used for mutual TLS, if configured.
fn client_identity(config: &ClientConfig) -> Result<Option<Identity>> {
    match (&config.client_cert, &config.client_key) {
        (None, None) => Ok(None),
        (Some(cert_path), Some(key_path)) => {
            let cert = read_pem(cert_path, "client certificate")?;
            let key = read_pem(key_path, "client key")?;
            Identity::from_pkcs8(&cert, &key)
                .map(Some)
                .map_err(|err| Error::Connection(format!("invalid client identity: {err}")))
        }
        _ => Err(Error::Connection(
            "client-cert and client-key must be set together".to_string(),
        )),
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>> {
    fs::read(path)
        .map_err(|err| Error::Io(format!("failed to read {what} {}: {err}", path.display())))
}
