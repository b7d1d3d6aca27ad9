//! Group search results.

use serde::Serialize;
use std::fmt;

/// A group the user belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    /// Common name (`cn`) of the group.
    pub name: String,
    /// Distinguished name of the group entry.
    pub dn: String,
}

impl Group {
    /// Creates a group from its common name and DN.
    #[must_use]
    pub fn new(name: impl Into<String>, dn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dn: dn.into(),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
