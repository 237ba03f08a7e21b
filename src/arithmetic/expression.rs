//! Operand chains for a single traversal hop.

use std::fmt;

use smallvec::SmallVec;

use crate::arithmetic::errors::ExpressionError;
use crate::types::Alias;

/// One factor of a multiplication chain.
///
/// Label and filter operands are diagonal, so they connect an alias to itself
/// and transposing them is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operand {
    /// Relationship matrix. `relation: None` selects the combined adjacency
    /// matrix of every relationship type.
    Adjacency {
        /// Relationship type.
        relation: Option<String>,
        /// Alias indexing the stored matrix's rows.
        src: Alias,
        /// Alias indexing the stored matrix's columns.
        dest: Alias,
        /// Whether the stored matrix is used transposed.
        transposed: bool,
    },
    /// Label diagonal matrix.
    Label {
        /// Label name.
        label: String,
        /// Alias the label applies to.
        alias: Alias,
    },
    /// Diagonal mask derived from a filter.
    FilterMask {
        /// Mask identifier resolved at evaluation time.
        mask: String,
        /// Alias the mask applies to.
        alias: Alias,
    },
}

impl Operand {
    /// Relationship operand in stored orientation.
    pub fn adjacency(
        relation: Option<&str>,
        src: impl Into<Alias>,
        dest: impl Into<Alias>,
    ) -> Self {
        Operand::Adjacency {
            relation: relation.map(str::to_owned),
            src: src.into(),
            dest: dest.into(),
            transposed: false,
        }
    }

    /// Label operand.
    pub fn label(label: impl Into<String>, alias: impl Into<Alias>) -> Self {
        Operand::Label {
            label: label.into(),
            alias: alias.into(),
        }
    }

    /// Filter-mask operand.
    pub fn mask(mask: impl Into<String>, alias: impl Into<Alias>) -> Self {
        Operand::FilterMask {
            mask: mask.into(),
            alias: alias.into(),
        }
    }

    /// Alias indexing the operand's rows as used in the chain.
    pub fn row_alias(&self) -> &Alias {
        match self {
            Operand::Adjacency {
                src,
                dest,
                transposed,
                ..
            } => {
                if *transposed {
                    dest
                } else {
                    src
                }
            }
            Operand::Label { alias, .. } | Operand::FilterMask { alias, .. } => alias,
        }
    }

    /// Alias indexing the operand's columns as used in the chain.
    pub fn col_alias(&self) -> &Alias {
        match self {
            Operand::Adjacency {
                src,
                dest,
                transposed,
                ..
            } => {
                if *transposed {
                    src
                } else {
                    dest
                }
            }
            Operand::Label { alias, .. } | Operand::FilterMask { alias, .. } => alias,
        }
    }

    /// Whether the stored matrix must be transposed before use.
    pub fn is_transposed(&self) -> bool {
        matches!(
            self,
            Operand::Adjacency {
                transposed: true,
                ..
            }
        )
    }

    /// Returns `true` for label and filter operands.
    pub fn is_diagonal(&self) -> bool {
        !matches!(self, Operand::Adjacency { .. })
    }

    fn transposed(&self) -> Operand {
        match self {
            Operand::Adjacency {
                relation,
                src,
                dest,
                transposed,
            } => Operand::Adjacency {
                relation: relation.clone(),
                src: src.clone(),
                dest: dest.clone(),
                transposed: !transposed,
            },
            diagonal => diagonal.clone(),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Adjacency {
                relation,
                src,
                dest,
                transposed,
            } => {
                let rel = relation.as_deref().unwrap_or("*");
                write!(f, "{rel}({src}->{dest})")?;
                if *transposed {
                    f.write_str("'")?;
                }
                Ok(())
            }
            Operand::Label { label, alias } => write!(f, ":{label}({alias})"),
            Operand::FilterMask { mask, alias } => write!(f, "mask:{mask}({alias})"),
        }
    }
}

/// Multiplication chain for one hop of a pattern.
///
/// The product of the chain has rows indexed by [`source_alias`] entities and
/// columns indexed by [`dest_alias`] entities. Instances are immutable; the
/// optimizer only reorders the collection that owns them.
///
/// [`source_alias`]: AlgebraicExpression::source_alias
/// [`dest_alias`]: AlgebraicExpression::dest_alias
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AlgebraicExpression {
    operands: SmallVec<[Operand; 4]>,
    src: Alias,
    dest: Alias,
    edge: Option<Alias>,
}

impl AlgebraicExpression {
    /// Builds an expression, deriving its endpoints from the chain.
    ///
    /// `edge` names the relationship variable the hop binds, if any.
    pub fn new<I>(operands: I, edge: Option<Alias>) -> Result<Self, ExpressionError>
    where
        I: IntoIterator<Item = Operand>,
    {
        let operands: SmallVec<[Operand; 4]> = operands.into_iter().collect();
        let (first, last) = match (operands.first(), operands.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(ExpressionError::EmptyChain),
        };
        for (position, pair) in operands.windows(2).enumerate() {
            if pair[0].col_alias() != pair[1].row_alias() {
                return Err(ExpressionError::Misaligned {
                    position: position + 1,
                    expected: pair[0].col_alias().clone(),
                    found: pair[1].row_alias().clone(),
                });
            }
        }
        let src = first.row_alias().clone();
        let dest = last.col_alias().clone();
        Ok(Self {
            operands,
            src,
            dest,
            edge,
        })
    }

    /// Builds an expression and checks that it spans `src` to `dest`.
    pub fn with_endpoints<I>(
        src: impl Into<Alias>,
        dest: impl Into<Alias>,
        operands: I,
        edge: Option<Alias>,
    ) -> Result<Self, ExpressionError>
    where
        I: IntoIterator<Item = Operand>,
    {
        let src = src.into();
        let dest = dest.into();
        let exp = Self::new(operands, edge)?;
        if exp.src != src || exp.dest != dest {
            return Err(ExpressionError::EndpointMismatch {
                src,
                dest,
                chain_src: exp.src,
                chain_dest: exp.dest,
            });
        }
        Ok(exp)
    }

    /// Single relationship hop `src -[edge:relation]-> dest`.
    pub fn hop(
        src: impl Into<Alias>,
        dest: impl Into<Alias>,
        relation: Option<&str>,
        edge: Option<Alias>,
    ) -> Self {
        let src = src.into();
        let dest = dest.into();
        Self {
            operands: SmallVec::from_iter([Operand::adjacency(relation, src.clone(), dest.clone())]),
            src,
            dest,
            edge,
        }
    }

    /// Label-only step on a single alias.
    pub fn label_scan(alias: impl Into<Alias>, label: impl Into<String>) -> Self {
        let alias = alias.into();
        Self {
            operands: SmallVec::from_iter([Operand::label(label, alias.clone())]),
            src: alias.clone(),
            dest: alias,
            edge: None,
        }
    }

    /// Alias indexing the rows of the product.
    pub fn source_alias(&self) -> &Alias {
        &self.src
    }

    /// Alias indexing the columns of the product.
    pub fn dest_alias(&self) -> &Alias {
        &self.dest
    }

    /// Relationship variable bound by this hop.
    pub fn edge_alias(&self) -> Option<&Alias> {
        self.edge.as_ref()
    }

    /// Operand chain in multiplication order.
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Source and destination aliases; a single entry when they coincide.
    pub fn entities_referenced(&self) -> SmallVec<[&Alias; 2]> {
        let mut out = SmallVec::new();
        out.push(&self.src);
        if self.dest != self.src {
            out.push(&self.dest);
        }
        out
    }

    /// Whether `alias` is the source or destination of the hop.
    pub fn references(&self, alias: &Alias) -> bool {
        &self.src == alias || &self.dest == alias
    }

    /// A filter step over a single entity: no relationship is traversed.
    pub fn is_label_only(&self) -> bool {
        self.src == self.dest && self.operands.iter().all(Operand::is_diagonal)
    }

    /// Reversed chain: the product of the result is the transpose of this
    /// expression's product.
    pub fn transpose(&self) -> Self {
        Self {
            operands: self.operands.iter().rev().map(Operand::transposed).collect(),
            src: self.dest.clone(),
            dest: self.src.clone(),
            edge: self.edge.clone(),
        }
    }
}

impl fmt::Display for AlgebraicExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, operand) in self.operands.iter().enumerate() {
            if idx > 0 {
                f.write_str(" * ")?;
            }
            write!(f, "{operand}")?;
        }
        Ok(())
    }
}
