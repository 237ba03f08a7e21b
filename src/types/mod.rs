#![forbid(unsafe_code)]

//! Identifier newtypes shared by the query model and the optimizer.

use std::fmt;

/// Name of a node or relationship variable within one graph pattern.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Alias(pub String);

impl Alias {
    /// Creates an alias from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Alias(name.into())
    }

    /// Returns the alias as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Alias {
    fn from(value: &str) -> Self {
        Alias(value.to_owned())
    }
}

impl From<String> for Alias {
    fn from(value: String) -> Self {
        Alias(value)
    }
}

impl AsRef<str> for Alias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
