//! Configuration schema for the cldap client.
//!
//! The layout mirrors the YAML document persisted under the user's home directory:
//!
//! ```yaml
//! ldap:
//!   client:
//!     configured: true
//!     base: dc=example,dc=com
//!     bind-dn: cn=readonly,dc=example,dc=com
//!     bind-password: secret
//!     group-filter: (memberUid=%s)
//!     user-filter: (uid=%s)
//!     host: ldap.example.com
//!     port: 389
//!     usessl: false
//!     server-name: ""
//!     skip-verify: false
//!     attributes: [cn, uid, givenName, sn]
//!   creds:
//!     has-creds: false
//!     username: ""
//!     password: ""
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Default port for plain LDAP.
pub const DEFAULT_LDAP_PORT: u16 = 389;
/// Default port for LDAP over TLS.
pub const DEFAULT_LDAPS_PORT: u16 = 636;
/// Default connection and operation timeout (seconds).
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// YAML keys of the mandatory client fields, in declaration order.
pub const MANDATORY_FIELDS: &[&str] = &[
    "base",
    "bind-dn",
    "bind-password",
    "group-filter",
    "user-filter",
    "host",
];

/// Root of the persisted configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapConfig {
    /// The `ldap` section.
    #[serde(default)]
    pub ldap: LdapSection,
}

/// Connection parameters plus cached credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LdapSection {
    /// Directory connection parameters.
    #[serde(default)]
    pub client: ClientConfig,

    /// Credentials of the last successful login.
    #[serde(default)]
    pub creds: Credentials,
}

/// Directory connection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default, rename_all = "kebab-case")]
#[validate(schema(function = "validate_address", skip_on_field_errors = false))]
pub struct ClientConfig {
    /// Set once the configuration has been validated and persisted
    pub configured: bool,

    /// Base DN under which all searches are scoped
    #[validate(length(min = 1, code = "base"))]
    pub base: String,

    /// DN of the read-only service account
    #[validate(length(min = 1, code = "bind-dn"))]
    pub bind_dn: String,

    /// Password of the read-only service account
    #[validate(length(min = 1, code = "bind-password"))]
    pub bind_password: String,

    /// Group search filter, `%s` is replaced by the username
    #[validate(length(min = 1, code = "group-filter"))]
    pub group_filter: String,

    /// User search filter, `%s` is replaced by the username
    #[validate(length(min = 1, code = "user-filter"))]
    pub user_filter: String,

    /// Directory host name or address
    pub host: String,

    /// Directory port, 0 selects the scheme default
    pub port: u16,

    /// Connect over TLS (`ldaps://`)
    #[serde(rename = "usessl")]
    pub use_ssl: bool,

    /// Name presented and verified during the TLS handshake
    pub server_name: String,

    /// Accept any server certificate
    pub skip_verify: bool,

    /// Attributes fetched for every user entry, in display order
    pub attributes: Vec<String>,

    /// Connection and per-operation timeout in seconds, 0 selects the default
    pub timeout: u64,

    /// Extra PEM root certificate trusted for TLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// PEM client certificate presented during the TLS handshake
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_cert: Option<PathBuf>,

    /// PKCS#8 PEM private key matching `client-cert`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            configured: false,
            base: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            group_filter: String::new(),
            user_filter: String::new(),
            host: String::new(),
            port: 0,
            use_ssl: false,
            server_name: String::new(),
            skip_verify: false,
            attributes: Vec::new(),
            timeout: DEFAULT_TIMEOUT_SECS,
            ca_cert: None,
            client_cert: None,
            client_key: None,
        }
    }
}

fn validate_address(client: &ClientConfig) -> std::result::Result<(), ValidationError> {
    if client.host.is_empty() && client.server_name.is_empty() {
        return Err(ValidationError::new("host"));
    }
    Ok(())
}

/// Maps validation failures back to the YAML keys of the offending fields.
pub(crate) fn missing_fields(errors: &ValidationErrors) -> Vec<String> {
    let codes: Vec<&str> = errors
        .errors()
        .values()
        .flat_map(|kind| match kind {
            ValidationErrorsKind::Field(issues) => {
                issues.iter().map(|issue| &*issue.code).collect::<Vec<_>>()
            }
            _ => Vec::new(),
        })
        .collect();

    MANDATORY_FIELDS
        .iter()
        .filter(|field| codes.contains(*field))
        .map(|field| (*field).to_string())
        .collect()
}

impl ClientConfig {
    /// Checks that every mandatory field is populated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming each empty mandatory field.
    pub fn check(&self) -> Result<()> {
        self.validate().map_err(Error::from)
    }

    /// Port to dial, falling back to the scheme default when unset.
    #[must_use]
    pub const fn effective_port(&self) -> u16 {
        if self.port != 0 {
            self.port
        } else if self.use_ssl {
            DEFAULT_LDAPS_PORT
        } else {
            DEFAULT_LDAP_PORT
        }
    }

    /// Host name used in the connection URL.
    ///
    /// With TLS enabled the server name wins so that certificate verification checks it.
    /// `ldap3` takes the TLS domain from the URL, so `server-name` must then resolve; an
    /// IP-only `host` is not dialed.
    #[must_use]
    pub fn dial_host(&self) -> &str {
        if (self.use_ssl && !self.server_name.is_empty()) || self.host.is_empty() {
            &self.server_name
        } else {
            &self.host
        }
    }

    /// Builds the `ldap://` or `ldaps://` URL for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the host cannot form a valid URL.
    pub fn url(&self) -> Result<Url> {
        let scheme = if self.use_ssl { "ldaps" } else { "ldap" };
        let host = self.dial_host();
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{host}]")
        } else {
            host.to_string()
        };
        Ok(Url::parse(&format!(
            "{scheme}://{host}:{}",
            self.effective_port()
        ))?)
    }

    /// Returns the timeout as a Duration, falling back to the default when unset.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        if self.timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.timeout)
        }
    }

    /// Returns true when a service account is configured.
    #[must_use]
    pub fn has_service_account(&self) -> bool {
        !self.bind_dn.is_empty()
    }
}

/// Credentials persisted after a successful login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Credentials {
    /// Set after a successful login
    pub has_creds: bool,
    /// Username used for the login
    pub username: String,
    /// Password used for the login
    pub password: String,
}

impl Credentials {
    /// Creates credentials marked as stored.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            has_creds: true,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl LdapConfig {
    /// Decodes a configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigDecode`] if the text is not a valid configuration document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Encodes the configuration as YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigDecode`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Shorthand for the client section.
    #[must_use]
    pub const fn client(&self) -> &ClientConfig {
        &self.ldap.client
    }

    /// Shorthand for the credentials section.
    #[must_use]
    pub const fn creds(&self) -> &Credentials {
        &self.ldap.creds
    }

    /// True once the configuration has been validated and persisted.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.ldap.client.configured
    }

    /// True once a login has succeeded.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.ldap.creds.has_creds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_client() -> ClientConfig {
        ClientConfig {
            base: "dc=example,dc=com".to_string(),
            bind_dn: "cn=readonly,dc=example,dc=com".to_string(),
            bind_password: "secret".to_string(),
            group_filter: "(memberUid=%s)".to_string(),
            user_filter: "(uid=%s)".to_string(),
            host: "ldap.example.com".to_string(),
            attributes: vec!["cn".to_string(), "uid".to_string()],
            ..ClientConfig::default()
        }
    }

    #[test]
    fn complete_client_passes_validation() {
        assert!(complete_client().check().is_ok());
    }

    #[test]
    fn empty_client_lists_every_mandatory_field() {
        let err = ClientConfig::default().check().unwrap_err();
        assert_eq!(
            err,
            Error::Validation {
                fields: MANDATORY_FIELDS.iter().map(|f| (*f).to_string()).collect()
            }
        );
    }

    #[test]
    fn validation_names_exactly_the_empty_fields() {
        let client = ClientConfig {
            bind_password: String::new(),
            user_filter: String::new(),
            ..complete_client()
        };
        let err = client.check().unwrap_err();
        assert_eq!(
            err,
            Error::Validation {
                fields: vec!["bind-password".to_string(), "user-filter".to_string()]
            }
        );
    }

    #[test]
    fn server_name_satisfies_host_requirement() {
        let client = ClientConfig {
            host: String::new(),
            server_name: "ldap.example.com".to_string(),
            ..complete_client()
        };
        assert!(client.check().is_ok());

        let client = ClientConfig {
            host: String::new(),
            ..complete_client()
        };
        assert_eq!(
            client.check().unwrap_err(),
            Error::Validation {
                fields: vec!["host".to_string()]
            }
        );
    }

    #[test]
    fn port_defaults_follow_scheme() {
        let mut client = complete_client();
        assert_eq!(client.effective_port(), 389);
        client.use_ssl = true;
        assert_eq!(client.effective_port(), 636);
        client.port = 10636;
        assert_eq!(client.effective_port(), 10636);
    }

    #[test]
    fn url_prefers_server_name_for_tls() {
        let mut client = complete_client();
        client.host = "10.0.0.5".to_string();
        client.server_name = "ldap.example.com".to_string();
        assert_eq!(client.url().unwrap().as_str(), "ldap://10.0.0.5:389");

        client.use_ssl = true;
        assert_eq!(client.url().unwrap().as_str(), "ldaps://ldap.example.com:636");
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let mut client = complete_client();
        client.timeout = 0;
        assert!(client.check().is_ok());
        assert_eq!(client.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        client.timeout = 3;
        assert_eq!(client.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn url_brackets_ipv6_hosts() {
        let client = ClientConfig {
            host: "::1".to_string(),
            ..complete_client()
        };
        assert_eq!(client.url().unwrap().as_str(), "ldap://[::1]:389");
    }

    #[test]
    fn decodes_documented_yaml_layout() {
        let yaml = r"
ldap:
  client:
    configured: false
    base: dc=example,dc=com
    bind-dn: cn=readonly,dc=example,dc=com
    bind-password: secret
    group-filter: (memberUid=%s)
    user-filter: (uid=%s)
    host: ldap.example.com
    port: 389
    usessl: true
    server-name: ldap.example.com
    skip-verify: true
    attributes: [cn, uid, givenName, sn]
  creds:
    has-creds: true
    username: alice
    password: wonderland
";
        let config = LdapConfig::from_yaml(yaml).unwrap();
        let client = config.client();
        assert_eq!(client.bind_dn, "cn=readonly,dc=example,dc=com");
        assert_eq!(client.user_filter, "(uid=%s)");
        assert!(client.use_ssl);
        assert!(client.skip_verify);
        assert_eq!(client.attributes, vec!["cn", "uid", "givenName", "sn"]);
        assert_eq!(client.timeout, DEFAULT_TIMEOUT_SECS);
        assert!(config.has_credentials());
        assert_eq!(config.creds().username, "alice");
    }

    #[test]
    fn decodes_tls_file_options() {
        let yaml = r"
ldap:
  client:
    ca-cert: /etc/cldap/ca.pem
    client-cert: /etc/cldap/client.pem
    client-key: /etc/cldap/client.key
";
        let client = LdapConfig::from_yaml(yaml).unwrap().ldap.client;
        assert_eq!(client.ca_cert, Some(PathBuf::from("/etc/cldap/ca.pem")));
        assert_eq!(client.client_cert, Some(PathBuf::from("/etc/cldap/client.pem")));
        assert_eq!(client.client_key, Some(PathBuf::from("/etc/cldap/client.key")));
    }

    #[test]
    fn partial_yaml_uses_defaults() {
        let config = LdapConfig::from_yaml("ldap:\n  client:\n    base: dc=example,dc=com\n")
            .unwrap();
        assert_eq!(config.client().base, "dc=example,dc=com");
        assert!(!config.is_configured());
        assert!(!config.has_credentials());
        assert!(config.client().attributes.is_empty());
    }

    #[test]
    fn encodes_kebab_case_keys() {
        let config = LdapConfig {
            ldap: LdapSection {
                client: complete_client(),
                creds: Credentials::new("alice", "wonderland"),
            },
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("bind-dn:"));
        assert!(yaml.contains("usessl:"));
        assert!(yaml.contains("has-creds: true"));
        assert!(!yaml.contains("ca-cert"));
        assert!(!yaml.contains("client-key"));
    }
}
