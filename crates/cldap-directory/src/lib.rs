//! LDAP directory access for the cldap client.
//!
//! This crate wraps the `ldap3` protocol client behind a small connector/session seam and
//! exposes the three directory operations the command line needs: authenticate a user,
//! search user entries, and list the groups a user belongs to.

#![deny(missing_docs)]

mod client;
mod filter;
mod group;
mod user;

pub use client::{Authentication, AuthenticationFailure, DirectoryClient, LdapEntry};
pub use filter::{build_filter, escape_filter_value, FILTER_PLACEHOLDER};
pub use group::Group;
pub use user::{User, UserAttributes};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = cldap_core::Result<T>;
