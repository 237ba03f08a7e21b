use std::fmt;

use thiserror::Error;

use crate::types::Alias;

/// Errors emitted while building a [`QueryGraph`](super::QueryGraph).
///
/// These indicate a defect in pattern decomposition rather than bad user
/// input, so callers usually surface them as plan-construction failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryGraphError {
    /// The alias was declared more than once.
    #[error("duplicate alias '{alias}'")]
    DuplicateAlias {
        /// Offending alias.
        alias: Alias,
    },
    /// An edge endpoint refers to a node alias that was never declared.
    #[error("edge '{edge}' references undeclared node '{endpoint}'")]
    MissingEndpoint {
        /// Edge alias being added.
        edge: Alias,
        /// Endpoint that could not be resolved.
        endpoint: Alias,
    },
}

impl QueryGraphError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            QueryGraphError::DuplicateAlias { .. } => "DuplicateAlias",
            QueryGraphError::MissingEndpoint { .. } => "MissingEndpoint",
        }
    }
}

/// Formats a [`QueryGraphError`] prefixed with its code.
pub struct QueryGraphErrorWithCode<'a>(pub &'a QueryGraphError);

impl fmt::Display for QueryGraphErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_code_prefixes_the_message() {
        let err = QueryGraphError::MissingEndpoint {
            edge: Alias::new("r"),
            endpoint: Alias::new("z"),
        };
        assert_eq!(
            QueryGraphErrorWithCode(&err).to_string(),
            "[MissingEndpoint] edge 'r' references undeclared node 'z'"
        );
    }
}
