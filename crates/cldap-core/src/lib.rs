//! # cldap-core
//!
//! Core types for the `cldap` LDAP client.
//!
//! This crate owns everything that is not protocol work: the persisted configuration
//! schema, its validation rules, the on-disk store under the user's home directory, and the
//! error type shared by every other crate in the workspace.
//!
//! ## Modules
//!
//! - [`error`] - Error type and stable error codes
//! - [`config`] - Configuration schema and mandatory-field validation
//! - [`store`] - Canonical config file location and persistence

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod store;

// Re-export commonly used types
pub use config::{ClientConfig, Credentials, LdapConfig, LdapSection};
pub use error::{Error, Result};
pub use store::ConfigStore;
