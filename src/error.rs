//! Crate-wide error type.

use thiserror::Error;

use crate::arithmetic::ExpressionError;
use crate::config::ConfigError;
use crate::optimizer::PlanError;
use crate::procedure::ProcedureError;
use crate::query::QueryGraphError;

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed query graph.
    #[error(transparent)]
    QueryGraph(#[from] QueryGraphError),
    /// Malformed expression or matrix operation failure.
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    /// Ordering or plan construction failure.
    #[error(transparent)]
    Plan(#[from] PlanError),
    /// Procedure protocol violation.
    #[error(transparent)]
    Procedure(#[from] ProcedureError),
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Logging could not be initialized.
    #[error("logging: {0}")]
    Logging(String),
}

impl Error {
    /// Machine-readable code of the underlying error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::QueryGraph(err) => err.code(),
            Error::Expression(err) => err.code(),
            Error::Plan(err) => err.code(),
            Error::Procedure(err) => err.code(),
            Error::Config(err) => err.code(),
            Error::Logging(_) => "Logging",
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, Error>;
