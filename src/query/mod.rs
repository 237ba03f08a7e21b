#![forbid(unsafe_code)]

//! Pattern-side data model consumed by the traversal optimizer.
//!
//! Upstream compilation produces a [`QueryGraph`] describing the pattern
//! topology and a [`FilterTree`] describing its predicates. Both are built
//! once per query and only read afterwards.

/// Structured errors raised while assembling query structures.
pub mod errors;

/// Predicate tree over pattern aliases.
///
/// The optimizer only consumes the set of aliases each predicate constrains.
pub mod filter;

/// Pattern topology: aliases, labels, and the edges declared between them.
pub mod graph;

/// Scalar values carried by predicates and procedure rows.
pub mod value;

pub use errors::QueryGraphError;
pub use filter::{CmpOp, CondOp, FilterNode, FilterOperand, FilterTree};
pub use graph::{QueryEdge, QueryGraph, QueryNode};
pub use value::Value;
