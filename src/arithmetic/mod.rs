#![forbid(unsafe_code)]

//! Algebraic representation of pattern hops.
//!
//! Each hop of a pattern compiles to an [`AlgebraicExpression`]: an ordered
//! chain of matrix operands whose product has rows indexed by the hop's source
//! entities and columns indexed by its destination entities.

/// Errors raised while building or evaluating expressions.
pub mod errors;

/// Reference evaluation of operand chains against a matrix source.
pub mod eval;

/// Operand chains and their alias bookkeeping.
pub mod expression;

/// In-process sparse matrix kernel.
///
/// Stands in for an external linear-algebra library; only the primitives the
/// evaluation stage and procedures need are provided.
pub mod matrix;

/// Graph-backed matrix sources.
pub mod source;

pub use errors::ExpressionError;
pub use eval::{evaluate, OperandResolver};
pub use expression::{AlgebraicExpression, Operand};
pub use matrix::{Semiring, SparseMatrix};
pub use source::{GraphMatrices, InMemoryGraph};
