//! Predicate tree attached to a pattern.

use std::collections::BTreeSet;

use crate::query::value::Value;
use crate::types::Alias;

/// Comparison operator used by a predicate leaf.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Boolean connective joining two subtrees.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CondOp {
    /// Both sides must hold.
    And,
    /// Either side must hold.
    Or,
}

/// One side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOperand {
    /// Property access on a pattern entity.
    Property {
        /// Entity being accessed.
        alias: Alias,
        /// Property name.
        prop: String,
    },
    /// The entity itself (identity comparisons such as `a = b`).
    Entity(Alias),
    /// Constant value.
    Literal(Value),
}

impl FilterOperand {
    /// Shorthand for a property access.
    pub fn prop(alias: impl Into<Alias>, prop: impl Into<String>) -> Self {
        FilterOperand::Property {
            alias: alias.into(),
            prop: prop.into(),
        }
    }

    /// Shorthand for a literal.
    pub fn lit(value: impl Into<Value>) -> Self {
        FilterOperand::Literal(value.into())
    }

    fn alias(&self) -> Option<&Alias> {
        match self {
            FilterOperand::Property { alias, .. } | FilterOperand::Entity(alias) => Some(alias),
            FilterOperand::Literal(_) => None,
        }
    }
}

/// Node of the predicate tree.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterNode {
    /// Leaf comparison.
    Predicate {
        /// Left operand.
        lhs: FilterOperand,
        /// Comparison operator.
        op: CmpOp,
        /// Right operand.
        rhs: FilterOperand,
    },
    /// Binary connective.
    Condition {
        /// Connective.
        op: CondOp,
        /// Left subtree.
        left: Box<FilterNode>,
        /// Right subtree.
        right: Box<FilterNode>,
    },
    /// Negated subtree.
    Not(Box<FilterNode>),
}

impl FilterNode {
    /// Builds a comparison leaf.
    pub fn predicate(lhs: FilterOperand, op: CmpOp, rhs: FilterOperand) -> Self {
        FilterNode::Predicate { lhs, op, rhs }
    }

    /// Joins two subtrees with AND.
    pub fn and(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Condition {
            op: CondOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Joins two subtrees with OR.
    pub fn or(left: FilterNode, right: FilterNode) -> Self {
        FilterNode::Condition {
            op: CondOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Negates a subtree.
    pub fn not(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }

    fn collect_into(&self, out: &mut BTreeSet<Alias>) {
        match self {
            FilterNode::Predicate { lhs, rhs, .. } => {
                out.extend(lhs.alias().cloned());
                out.extend(rhs.alias().cloned());
            }
            FilterNode::Condition { left, right, .. } => {
                left.collect_into(out);
                right.collect_into(out);
            }
            FilterNode::Not(child) => child.collect_into(out),
        }
    }

    /// Aliases constrained anywhere beneath this node.
    pub fn aliases(&self) -> BTreeSet<Alias> {
        let mut out = BTreeSet::new();
        self.collect_into(&mut out);
        out
    }

    fn references(&self, alias: &Alias) -> bool {
        match self {
            FilterNode::Predicate { lhs, rhs, .. } => {
                lhs.alias() == Some(alias) || rhs.alias() == Some(alias)
            }
            FilterNode::Condition { left, right, .. } => {
                left.references(alias) || right.references(alias)
            }
            FilterNode::Not(child) => child.references(alias),
        }
    }

    fn predicate_count(&self) -> usize {
        match self {
            FilterNode::Predicate { .. } => 1,
            FilterNode::Condition { left, right, .. } => {
                left.predicate_count() + right.predicate_count()
            }
            FilterNode::Not(child) => child.predicate_count(),
        }
    }

    fn split_conjunctions<'a>(&'a self, out: &mut Vec<&'a FilterNode>) {
        match self {
            FilterNode::Condition {
                op: CondOp::And,
                left,
                right,
            } => {
                left.split_conjunctions(out);
                right.split_conjunctions(out);
            }
            other => out.push(other),
        }
    }
}

/// Predicate tree over pattern entities.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterTree {
    root: FilterNode,
}

impl FilterTree {
    /// Wraps a root node.
    pub fn new(root: FilterNode) -> Self {
        Self { root }
    }

    /// AND-combines the supplied nodes, returning `None` when there are none.
    pub fn all<I>(nodes: I) -> Option<Self>
    where
        I: IntoIterator<Item = FilterNode>,
    {
        nodes
            .into_iter()
            .reduce(FilterNode::and)
            .map(FilterTree::new)
    }

    /// Root node of the tree.
    pub fn root(&self) -> &FilterNode {
        &self.root
    }

    /// Every alias referenced by any predicate in the tree.
    pub fn collect_aliases(&self) -> BTreeSet<Alias> {
        self.root.aliases()
    }

    /// Returns `true` if some predicate constrains `alias`.
    pub fn references(&self, alias: &Alias) -> bool {
        self.root.references(alias)
    }

    /// Number of comparison leaves.
    pub fn predicate_count(&self) -> usize {
        self.root.predicate_count()
    }

    /// Independent conjuncts: the tree split at every top-level AND.
    pub fn sub_trees(&self) -> Vec<&FilterNode> {
        let mut out = Vec::new();
        self.root.split_conjunctions(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn age_over(alias: &str, min: i64) -> FilterNode {
        FilterNode::predicate(FilterOperand::prop(alias, "age"), CmpOp::Gt, FilterOperand::lit(min))
    }

    #[test]
    fn collects_aliases_through_every_connective() {
        let tree = FilterTree::new(FilterNode::and(
            age_over("a", 30),
            FilterNode::or(
                FilterNode::not(age_over("c", 10)),
                FilterNode::predicate(
                    FilterOperand::Entity(Alias::new("b")),
                    CmpOp::Ne,
                    FilterOperand::Entity(Alias::new("c")),
                ),
            ),
        ));
        let aliases: Vec<_> = tree.collect_aliases().into_iter().map(|a| a.0).collect();
        assert_eq!(aliases, vec!["a", "b", "c"]);
        assert!(tree.references(&Alias::new("b")));
        assert!(!tree.references(&Alias::new("d")));
        assert_eq!(tree.predicate_count(), 3);
    }

    #[test]
    fn literal_only_predicates_reference_nothing() {
        let tree = FilterTree::new(FilterNode::predicate(
            FilterOperand::lit(1_i64),
            CmpOp::Eq,
            FilterOperand::lit(1_i64),
        ));
        assert!(tree.collect_aliases().is_empty());
    }

    #[test]
    fn sub_trees_split_only_top_level_conjunctions() {
        let tree = FilterTree::all([
            age_over("a", 1),
            age_over("b", 2),
            FilterNode::or(age_over("c", 3), age_over("d", 4)),
        ])
        .expect("non-empty");
        let parts = tree.sub_trees();
        assert_eq!(parts.len(), 3);
        assert!(matches!(parts[2], FilterNode::Condition { op: CondOp::Or, .. }));
        assert!(FilterTree::all(Vec::new()).is_none());
    }
}
