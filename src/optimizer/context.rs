//! Read-only state shared by one optimization call.

use std::collections::BTreeSet;

use crate::arithmetic::AlgebraicExpression;
use crate::config::OptimizerOptions;
use crate::optimizer::errors::PlanError;
use crate::query::{FilterTree, QueryGraph};
use crate::types::Alias;

/// Inputs of a single ordering call.
///
/// The context carries no "best so far" state: search routines return their
/// best candidate to the caller instead, so concurrent optimizations never
/// share anything mutable.
#[derive(Debug)]
pub struct OrderingContext<'a> {
    qg: &'a QueryGraph,
    filtered: BTreeSet<Alias>,
    bound: &'a BTreeSet<Alias>,
    options: &'a OptimizerOptions,
}

impl<'a> OrderingContext<'a> {
    /// Collects the filtered aliases once and captures the other inputs.
    pub fn new(
        qg: &'a QueryGraph,
        filters: Option<&FilterTree>,
        bound: &'a BTreeSet<Alias>,
        options: &'a OptimizerOptions,
    ) -> Self {
        Self {
            qg,
            filtered: filters.map(FilterTree::collect_aliases).unwrap_or_default(),
            bound,
            options,
        }
    }

    /// Whether some predicate constrains `alias`.
    pub fn is_filtered(&self, alias: &Alias) -> bool {
        self.filtered.contains(alias)
    }

    /// Whether `alias` was resolved before this call.
    pub fn is_bound(&self, alias: &Alias) -> bool {
        self.bound.contains(alias)
    }

    /// Rejects expressions whose aliases are absent from the query graph.
    pub fn check_preconditions(&self, exps: &[AlgebraicExpression]) -> Result<(), PlanError> {
        for exp in exps {
            let roles = [
                (Some(exp.source_alias()), "source"),
                (Some(exp.dest_alias()), "destination"),
                (exp.edge_alias(), "edge"),
            ];
            for (alias, context) in roles {
                if let Some(alias) = alias {
                    if !self.qg.contains(alias) {
                        return Err(PlanError::UnknownAlias {
                            alias: alias.clone(),
                            context,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Whether `candidate` may follow `prefix`.
    ///
    /// The first expression is always valid. Later ones must share an alias
    /// with some placed expression or with the bound set, so evaluation never
    /// materializes a cross product.
    pub fn valid_position(
        &self,
        prefix: &[&AlgebraicExpression],
        candidate: &AlgebraicExpression,
    ) -> bool {
        prefix.is_empty()
            || self.connects(candidate, |alias| {
                prefix.iter().any(|placed| placed.references(alias))
            })
    }

    /// Connectivity test behind [`valid_position`](Self::valid_position) for
    /// a non-empty prefix, with the placed aliases supplied as a predicate.
    pub fn connects<F>(&self, candidate: &AlgebraicExpression, placed: F) -> bool
    where
        F: Fn(&Alias) -> bool,
    {
        candidate
            .entities_referenced()
            .into_iter()
            .any(|alias| self.is_bound(alias) || placed(alias))
    }

    /// Score gained by placing `exp` at `position` in an arrangement of
    /// `total` expressions.
    pub fn contribution(&self, exp: &AlgebraicExpression, position: usize, total: usize) -> i64 {
        let weight = total.saturating_sub(position) as i64;
        let mut score = 0;
        for alias in exp.entities_referenced() {
            if self.is_filtered(alias) {
                score += weight;
            }
            if self.is_bound(alias) {
                score += weight;
            }
        }
        if exp.is_label_only() {
            score += self.options.label_only_bonus;
        }
        score
    }

    /// Total score of a complete arrangement.
    pub fn score_arrangement(&self, arrangement: &[&AlgebraicExpression]) -> i64 {
        let total = arrangement.len();
        arrangement
            .iter()
            .enumerate()
            .map(|(position, exp)| self.contribution(exp, position, total))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{CmpOp, FilterNode, FilterOperand};

    fn chain_graph() -> QueryGraph {
        let mut qg = QueryGraph::new();
        for alias in ["a", "b", "c", "d"] {
            qg.add_node(alias, Vec::<String>::new()).unwrap();
        }
        qg
    }

    fn filter_on(alias: &str) -> FilterTree {
        FilterTree::new(FilterNode::predicate(
            FilterOperand::prop(alias, "name"),
            CmpOp::Eq,
            FilterOperand::lit("x"),
        ))
    }

    #[test]
    fn first_position_is_always_valid() {
        let qg = chain_graph();
        let bound = BTreeSet::new();
        let opts = OptimizerOptions::default();
        let ctx = OrderingContext::new(&qg, None, &bound, &opts);
        let e3 = AlgebraicExpression::hop("c", "d", None, None);
        assert!(ctx.valid_position(&[], &e3));
        let e1 = AlgebraicExpression::hop("a", "b", None, None);
        assert!(!ctx.valid_position(&[&e1], &e3));
        let e2 = AlgebraicExpression::hop("b", "c", None, None);
        assert!(ctx.valid_position(&[&e1], &e2));
    }

    #[test]
    fn bound_aliases_satisfy_connectivity() {
        let qg = chain_graph();
        let bound = BTreeSet::from([Alias::new("c")]);
        let opts = OptimizerOptions::default();
        let ctx = OrderingContext::new(&qg, None, &bound, &opts);
        let e1 = AlgebraicExpression::hop("a", "b", None, None);
        let e3 = AlgebraicExpression::hop("c", "d", None, None);
        assert!(ctx.valid_position(&[&e1], &e3));
    }

    #[test]
    fn earlier_filtered_and_bound_aliases_score_higher() {
        let qg = chain_graph();
        let bound = BTreeSet::from([Alias::new("a")]);
        let opts = OptimizerOptions::default();
        let filters = filter_on("c");
        let ctx = OrderingContext::new(&qg, Some(&filters), &bound, &opts);
        let e1 = AlgebraicExpression::hop("a", "b", None, None);
        let e2 = AlgebraicExpression::hop("b", "c", None, None);
        let e3 = AlgebraicExpression::hop("c", "d", None, None);
        // a bound at 0 (+3), c filtered at 1 (+2) and 2 (+1).
        assert_eq!(ctx.score_arrangement(&[&e1, &e2, &e3]), 6);
        // c filtered at 0 (+3) and 1 (+2), a bound at 2 (+1).
        assert_eq!(ctx.score_arrangement(&[&e3, &e2, &e1]), 6);
        // c filtered at 0 (+3) and 2 (+1), a bound at 1 (+2).
        assert_eq!(ctx.score_arrangement(&[&e2, &e1, &e3]), 6);
        assert_eq!(ctx.contribution(&e2, 0, 3), 3);
        assert_eq!(ctx.contribution(&e1, 2, 3), 1);
    }

    #[test]
    fn label_only_steps_receive_flat_bonus() {
        let qg = chain_graph();
        let bound = BTreeSet::new();
        let opts = OptimizerOptions {
            label_only_bonus: 5,
            ..OptimizerOptions::default()
        };
        let ctx = OrderingContext::new(&qg, None, &bound, &opts);
        let scan = AlgebraicExpression::label_scan("a", "Person");
        assert_eq!(ctx.contribution(&scan, 0, 2), 5);
        assert_eq!(ctx.contribution(&scan, 1, 2), 5);
    }

    #[test]
    fn unknown_aliases_are_precondition_failures() {
        let qg = chain_graph();
        let bound = BTreeSet::new();
        let opts = OptimizerOptions::default();
        let ctx = OrderingContext::new(&qg, None, &bound, &opts);
        let exps = [AlgebraicExpression::hop("a", "zz", None, None)];
        let err = ctx.check_preconditions(&exps).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnknownAlias {
                alias: Alias::new("zz"),
                context: "destination",
            }
        );
        let exps = [AlgebraicExpression::hop("a", "b", None, Some(Alias::new("r")))];
        assert_eq!(ctx.check_preconditions(&exps).unwrap_err().code(), "UnknownAlias");
    }
}
