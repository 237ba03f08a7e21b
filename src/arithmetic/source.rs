//! Matrices describing a stored graph.

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::arithmetic::errors::ExpressionError;
use crate::arithmetic::eval::OperandResolver;
use crate::arithmetic::expression::Operand;
use crate::arithmetic::matrix::SparseMatrix;

/// Read access to the matrices of a graph.
pub trait GraphMatrices {
    /// Dimension shared by every square graph matrix.
    fn required_dim(&self) -> u64;
    /// Boolean matrix of every relationship regardless of type.
    fn adjacency_matrix(&self) -> &SparseMatrix;
    /// Matrix of one relationship type; entries hold edge ids.
    fn relation_matrix(&self, relation: &str) -> Option<&SparseMatrix>;
    /// Diagonal matrix of one label.
    fn label_matrix(&self, label: &str) -> Option<&SparseMatrix>;
}

/// Graph held entirely in memory.
#[derive(Clone, Debug)]
pub struct InMemoryGraph {
    dim: u64,
    adjacency: SparseMatrix,
    relations: BTreeMap<String, SparseMatrix>,
    labels: BTreeMap<String, SparseMatrix>,
    masks: BTreeMap<String, SparseMatrix>,
    next_edge_id: u64,
}

impl InMemoryGraph {
    /// Creates a graph with capacity for `dim` nodes.
    pub fn new(dim: u64) -> Self {
        Self {
            dim,
            adjacency: SparseMatrix::new(dim, dim),
            relations: BTreeMap::new(),
            labels: BTreeMap::new(),
            masks: BTreeMap::new(),
            next_edge_id: 0,
        }
    }

    /// Connects `src` to `dest` with a relationship of type `relation`,
    /// returning the new edge id.
    pub fn add_edge(&mut self, relation: &str, src: u64, dest: u64) -> Result<u64, ExpressionError> {
        let dim = self.dim;
        let id = self.next_edge_id;
        self.relations
            .entry(relation.to_owned())
            .or_insert_with(|| SparseMatrix::new(dim, dim))
            .set_element(id, src, dest)?;
        self.adjacency.set_element(1, src, dest)?;
        self.next_edge_id += 1;
        Ok(id)
    }

    /// Tags `node` with `label`.
    pub fn add_label(&mut self, label: &str, node: u64) -> Result<(), ExpressionError> {
        let dim = self.dim;
        self.labels
            .entry(label.to_owned())
            .or_insert_with(|| SparseMatrix::new(dim, dim))
            .set_element(1, node, node)
    }

    /// Registers a filter mask selecting `nodes`.
    pub fn add_mask<I>(&mut self, name: &str, nodes: I) -> Result<(), ExpressionError>
    where
        I: IntoIterator<Item = u64>,
    {
        let mask = SparseMatrix::diagonal(self.dim, nodes)?;
        self.masks.insert(name.to_owned(), mask);
        Ok(())
    }

    fn empty(&self) -> SparseMatrix {
        SparseMatrix::new(self.dim, self.dim)
    }
}

impl GraphMatrices for InMemoryGraph {
    fn required_dim(&self) -> u64 {
        self.dim
    }

    fn adjacency_matrix(&self) -> &SparseMatrix {
        &self.adjacency
    }

    fn relation_matrix(&self, relation: &str) -> Option<&SparseMatrix> {
        self.relations.get(relation)
    }

    fn label_matrix(&self, label: &str) -> Option<&SparseMatrix> {
        self.labels.get(label)
    }
}

impl OperandResolver for InMemoryGraph {
    fn resolve(&self, operand: &Operand) -> Result<Cow<'_, SparseMatrix>, ExpressionError> {
        let found = match operand {
            Operand::Adjacency { relation: None, .. } => Some(&self.adjacency),
            Operand::Adjacency {
                relation: Some(relation),
                ..
            } => self.relation_matrix(relation),
            Operand::Label { label, .. } => self.label_matrix(label),
            Operand::FilterMask { mask, .. } => {
                return self
                    .masks
                    .get(mask)
                    .map(Cow::Borrowed)
                    .ok_or_else(|| ExpressionError::UnknownMask { mask: mask.clone() });
            }
        };
        Ok(found.map_or_else(|| Cow::Owned(self.empty()), Cow::Borrowed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::eval::evaluate;
    use crate::arithmetic::expression::AlgebraicExpression;

    fn social() -> InMemoryGraph {
        let mut g = InMemoryGraph::new(4);
        g.add_label("Person", 0).unwrap();
        g.add_label("Person", 1).unwrap();
        g.add_label("City", 2).unwrap();
        g.add_edge("KNOWS", 0, 1).unwrap();
        g.add_edge("LIVES_IN", 1, 2).unwrap();
        g.add_edge("LIVES_IN", 3, 2).unwrap();
        g
    }

    #[test]
    fn evaluates_label_filtered_two_hop_chain() {
        let g = social();
        let exp = AlgebraicExpression::new(
            [
                Operand::label("Person", "a"),
                Operand::adjacency(Some("KNOWS"), "a", "b"),
                Operand::adjacency(Some("LIVES_IN"), "b", "c"),
                Operand::label("City", "c"),
            ],
            None,
        )
        .unwrap();
        let result = evaluate(&exp, &g).unwrap();
        assert_eq!(result.extract_tuples(), (vec![0], vec![2], vec![1]));
    }

    #[test]
    fn transposed_operands_walk_backwards() {
        let g = social();
        let exp = AlgebraicExpression::hop("c", "p", Some("LIVES_IN"), None);
        let forward = evaluate(&exp, &g).unwrap();
        let backward = evaluate(&exp.transpose(), &g).unwrap();
        assert_eq!(backward, forward.transpose());
        assert_eq!(backward.get(2, 3), Some(2));
    }

    #[test]
    fn unknown_relation_is_empty_but_unknown_mask_fails() {
        let g = social();
        let exp = AlgebraicExpression::hop("a", "b", Some("MISSING"), None);
        assert_eq!(evaluate(&exp, &g).unwrap().nvals(), 0);

        let masked = AlgebraicExpression::new([Operand::mask("f1", "a")], None).unwrap();
        let err = evaluate(&masked, &g).unwrap_err();
        assert_eq!(err.code(), "UnknownMask");
    }

    #[test]
    fn masks_restrict_rows() {
        let mut g = social();
        g.add_mask("young", [3]).unwrap();
        let exp = AlgebraicExpression::new(
            [
                Operand::mask("young", "p"),
                Operand::adjacency(Some("LIVES_IN"), "p", "c"),
            ],
            None,
        )
        .unwrap();
        let result = evaluate(&exp, &g).unwrap();
        assert_eq!(result.extract_tuples(), (vec![3], vec![2], vec![1]));
    }
}
