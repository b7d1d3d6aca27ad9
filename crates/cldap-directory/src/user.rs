//! User search results.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

use crate::client::LdapEntry;

/// Attribute values of one entry, kept in the configured attribute order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAttributes(Vec<(String, String)>);

impl UserAttributes {
    /// Extracts the first value of each requested attribute.
    ///
    /// Attributes the entry does not carry map to an empty string.
    #[must_use]
    pub fn from_entry(entry: &LdapEntry, names: &[String]) -> Self {
        Self(
            names
                .iter()
                .map(|name| {
                    let value = entry.first(name).unwrap_or_default().to_string();
                    (name.clone(), value)
                })
                .collect(),
        )
    }

    /// Returns the value recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over `(attribute, value)` pairs in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no attributes were extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Renders each pair as `attribute:value`.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<String> {
        self.iter()
            .map(|(key, value)| format!("{key}:{value}"))
            .collect()
    }
}

impl Serialize for UserAttributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl fmt::Display for UserAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.to_pairs().join(" "))
    }
}

/// A user entry returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Distinguished name of the entry.
    pub dn: String,
    /// Login name, the entry's `uid` when present.
    pub username: String,
    /// `attribute:value` strings in configured attribute order.
    pub attributes: Vec<String>,
}

impl User {
    /// Builds a user from a search entry.
    ///
    /// `searched` is used as the username when the entry carries no `uid`.
    #[must_use]
    pub fn from_entry(entry: &LdapEntry, searched: &str, attributes: &[String]) -> Self {
        let username = entry
            .first("uid")
            .filter(|uid| !uid.is_empty())
            .unwrap_or(searched)
            .to_string();

        Self {
            dn: entry.dn.clone(),
            username,
            attributes: UserAttributes::from_entry(entry, attributes).to_pairs(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.username, self.attributes.join(" "))
    }
}
