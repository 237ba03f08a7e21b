#![forbid(unsafe_code)]

//! Traversal-order optimization.
//!
//! Given the algebraic expressions of one pattern, pick the order in which
//! they are evaluated. Every step must extend the already-connected frontier,
//! and among valid orders the one that applies filters and touches bound
//! entities earliest wins.

/// Partitioning of an expression set into connected components.
pub mod components;

/// Per-call ordering state: validity predicate and scoring.
pub mod context;

/// Structured errors raised by the optimizer.
pub mod errors;

/// Orientation of ordered expressions and explain output.
pub mod plan;

/// Exhaustive and greedy arrangement search.
pub mod traverse_order;

pub use context::OrderingContext;
pub use errors::PlanError;
pub use plan::{ExplainNode, TraversalPlan, TraversalStep};
pub use traverse_order::{
    order_expressions, Arrangement, SearchMode, SearchStats, TraverseOrderOptimizer,
};
