use thiserror::Error;

use crate::types::Alias;

/// Structural and shape errors for algebraic expressions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// An expression needs at least one operand.
    #[error("algebraic expression requires at least one operand")]
    EmptyChain,
    /// Operand `position` does not start where the previous operand ends.
    #[error("operand {position} expects rows of '{expected}' but is indexed by '{found}'")]
    Misaligned {
        /// Index of the offending operand.
        position: usize,
        /// Column alias of the previous operand.
        expected: Alias,
        /// Row alias of the offending operand.
        found: Alias,
    },
    /// The chain's endpoints differ from the declared source/destination.
    #[error("operand chain spans '{chain_src}'->'{chain_dest}' but expression declares '{src}'->'{dest}'")]
    EndpointMismatch {
        /// Declared source alias.
        src: Alias,
        /// Declared destination alias.
        dest: Alias,
        /// Row alias of the first operand.
        chain_src: Alias,
        /// Column alias of the last operand.
        chain_dest: Alias,
    },
    /// Matrix dimensions are incompatible for the requested operation.
    #[error("shape mismatch: {left_rows}x{left_cols} vs {right_rows}x{right_cols}")]
    ShapeMismatch {
        /// Rows of the left operand.
        left_rows: u64,
        /// Columns of the left operand.
        left_cols: u64,
        /// Rows of the right operand.
        right_rows: u64,
        /// Columns of the right operand.
        right_cols: u64,
    },
    /// Element coordinates fall outside the matrix.
    #[error("index ({row}, {col}) out of bounds for {nrows}x{ncols} matrix")]
    IndexOutOfBounds {
        /// Requested row.
        row: u64,
        /// Requested column.
        col: u64,
        /// Matrix rows.
        nrows: u64,
        /// Matrix columns.
        ncols: u64,
    },
    /// The resolver has no matrix for a filter mask.
    #[error("no matrix registered for mask '{mask}'")]
    UnknownMask {
        /// Mask name.
        mask: String,
    },
}

impl ExpressionError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            ExpressionError::EmptyChain => "EmptyChain",
            ExpressionError::Misaligned { .. } => "Misaligned",
            ExpressionError::EndpointMismatch { .. } => "EndpointMismatch",
            ExpressionError::ShapeMismatch { .. } => "ShapeMismatch",
            ExpressionError::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ExpressionError::UnknownMask { .. } => "UnknownMask",
        }
    }
}
