use std::fmt;

use thiserror::Error;

use crate::types::Alias;

/// Precondition failures detected before or during ordering.
///
/// Each of these points at an upstream pattern-decomposition defect; none is
/// transient.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// An expression references an alias missing from the query graph.
    #[error("{context} alias '{alias}' is not part of the query graph")]
    UnknownAlias {
        /// Alias that could not be resolved.
        alias: Alias,
        /// Which role the alias played in the expression.
        context: &'static str,
    },
    /// The expressions span several components and splitting is disabled.
    #[error("expressions span {components} disconnected components")]
    DisconnectedPattern {
        /// Number of components found.
        components: usize,
    },
    /// An arrangement was applied to a collection of a different size.
    #[error("arrangement covers {expected} expressions but {found} were supplied")]
    ArrangementMismatch {
        /// Length of the arrangement.
        expected: usize,
        /// Length of the supplied collection.
        found: usize,
    },
}

impl PlanError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::UnknownAlias { .. } => "UnknownAlias",
            PlanError::DisconnectedPattern { .. } => "DisconnectedPattern",
            PlanError::ArrangementMismatch { .. } => "ArrangementMismatch",
        }
    }
}

/// Formats a [`PlanError`] prefixed with its code.
pub struct PlanErrorWithCode<'a>(pub &'a PlanError);

impl fmt::Display for PlanErrorWithCode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.0.code(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_code_prefixes_the_message() {
        let err = PlanError::UnknownAlias {
            alias: Alias::new("zz"),
            context: "edge",
        };
        assert_eq!(
            PlanErrorWithCode(&err).to_string(),
            "[UnknownAlias] edge alias 'zz' is not part of the query graph"
        );
        let err = PlanError::DisconnectedPattern { components: 3 };
        assert_eq!(
            PlanErrorWithCode(&err).to_string(),
            "[DisconnectedPattern] expressions span 3 disconnected components"
        );
    }
}
