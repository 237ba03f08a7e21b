//! Traversal-order planning for graph patterns compiled to sparse-matrix
//! multiplication chains.
//!
//! A pattern is decomposed upstream into [`arithmetic::AlgebraicExpression`]s,
//! one per hop. The [`optimizer`] picks the order in which those hops are
//! evaluated, and [`procedure`] hosts the lazy row producers that execution
//! plans may call as leaf operators.

#![warn(missing_docs)]

pub mod arithmetic;
pub mod config;
pub mod error;
pub mod logging;
pub mod optimizer;
pub mod procedure;
pub mod query;
pub mod types;

pub use error::{Error, Result};
