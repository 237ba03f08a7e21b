//! Chain evaluation against a matrix source.

use std::borrow::Cow;

use tracing::trace;

use crate::arithmetic::errors::ExpressionError;
use crate::arithmetic::expression::{AlgebraicExpression, Operand};
use crate::arithmetic::matrix::{Semiring, SparseMatrix};

/// Maps operands to the stored matrices backing them.
///
/// Implementations return the matrix in stored orientation; [`evaluate`]
/// applies the operand's transpose flag.
pub trait OperandResolver {
    /// Resolves the matrix behind `operand`.
    fn resolve(&self, operand: &Operand) -> Result<Cow<'_, SparseMatrix>, ExpressionError>;
}

/// Multiplies an expression's operand chain left to right over the boolean
/// semiring.
pub fn evaluate<R>(exp: &AlgebraicExpression, resolver: &R) -> Result<SparseMatrix, ExpressionError>
where
    R: OperandResolver + ?Sized,
{
    let mut acc: Option<SparseMatrix> = None;
    for operand in exp.operands() {
        let stored = resolver.resolve(operand)?;
        let factor = if operand.is_transposed() {
            Cow::Owned(stored.transpose())
        } else {
            stored
        };
        acc = Some(match acc {
            None => factor.into_owned(),
            Some(left) => left.multiply(&factor, Semiring::AnyPair)?,
        });
        trace!(operand = %operand, "multiplied operand");
    }
    acc.ok_or(ExpressionError::EmptyChain)
}
