//! Oriented traversal plan built from an arrangement.
//!
//! Ordering decides *when* each hop runs; orientation decides *which end* it
//! starts from. A hop whose source is still unresolved but whose destination
//! is already known is transposed so evaluation always extends from resolved
//! entities.

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use std::hash::Hasher;

use xxhash_rust::xxh64::Xxh64;

use crate::arithmetic::AlgebraicExpression;
use crate::optimizer::errors::PlanError;
use crate::optimizer::traverse_order::{hash_expression, Arrangement};
use crate::query::FilterTree;
use crate::types::Alias;

/// One hop of the plan in evaluation order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalStep {
    /// Expression as it will be evaluated (possibly transposed).
    pub expression: AlgebraicExpression,
    /// Index of the expression in the optimizer's input.
    pub input_index: usize,
    /// Whether the input expression was transposed.
    pub transposed: bool,
    /// Whether this step starts a new connected component.
    pub root: bool,
}

/// Ordered, oriented hops ready for the execution-plan builder.
#[derive(Clone, Debug)]
pub struct TraversalPlan {
    steps: Vec<TraversalStep>,
    score: i64,
    plan_hash: u64,
}

impl TraversalPlan {
    /// Orients the expressions of `arrangement`.
    pub fn build(
        exps: &[AlgebraicExpression],
        arrangement: &Arrangement,
        filters: Option<&FilterTree>,
        bound: &BTreeSet<Alias>,
    ) -> Result<Self, PlanError> {
        let ordered = arrangement.apply(exps)?;
        let filtered = filters.map(FilterTree::collect_aliases).unwrap_or_default();
        let mut resolved: BTreeSet<&Alias> = bound.iter().collect();
        let mut steps = Vec::with_capacity(ordered.len());
        let mut hasher = Xxh64::new(0);
        for (position, (exp, &input_index)) in ordered.into_iter().zip(arrangement.order()).enumerate() {
            let src = exp.source_alias();
            let dest = exp.dest_alias();
            let transposed = if resolved.contains(src) {
                false
            } else if resolved.contains(dest) {
                true
            } else {
                // Fresh root: start from the filtered end when only one is.
                filtered.contains(dest) && !filtered.contains(src)
            };
            resolved.insert(src);
            resolved.insert(dest);
            let expression = if transposed {
                exp.transpose()
            } else {
                exp.clone()
            };
            hash_expression(&expression, &mut hasher);
            steps.push(TraversalStep {
                expression,
                input_index,
                transposed,
                root: arrangement.roots().contains(&position),
            });
        }
        Ok(Self {
            steps,
            score: arrangement.score(),
            plan_hash: hasher.finish(),
        })
    }

    /// Steps in evaluation order.
    pub fn steps(&self) -> &[TraversalStep] {
        &self.steps
    }

    /// Score of the underlying arrangement.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Deterministic hash over the oriented steps.
    pub fn plan_hash(&self) -> u64 {
        self.plan_hash
    }

    /// Explain tree: one chain of steps per component, joined by a cartesian
    /// product when there is more than one.
    pub fn explain(&self) -> ExplainNode {
        let mut chains: Vec<ExplainNode> = Vec::new();
        for step in &self.steps {
            let mut node = ExplainNode::new(step_op(step));
            node.props = vec![
                ExplainProp::new("expr", step.expression.to_string()),
                ExplainProp::new("src", step.expression.source_alias().as_str()),
                ExplainProp::new("dest", step.expression.dest_alias().as_str()),
            ];
            if step.transposed {
                node.props.push(ExplainProp::new("transposed", "true"));
            }
            if !step.root {
                if let Some(prev) = chains.last_mut() {
                    let input = std::mem::replace(prev, node);
                    prev.inputs.push(input);
                    continue;
                }
            }
            chains.push(node);
        }
        let mut root = ExplainNode::new("TraversalPlan");
        root.props = vec![
            ExplainProp::new("score", self.score.to_string()),
            ExplainProp::new("plan_hash", format!("{:016x}", self.plan_hash)),
        ];
        if chains.len() > 1 {
            let mut product = ExplainNode::new("CartesianProduct");
            product.inputs = chains;
            root.inputs.push(product);
        } else {
            root.inputs = chains;
        }
        root
    }
}

fn step_op(step: &TraversalStep) -> &'static str {
    if step.expression.is_label_only() {
        "LabelFilter"
    } else if step.root {
        "ScanTraverse"
    } else {
        "Traverse"
    }
}

/// Explain node representing an operator with its properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplainNode {
    /// Operator name
    pub op: String,
    /// Additional properties describing the operator
    pub props: Vec<ExplainProp>,
    /// Input operators
    pub inputs: Vec<ExplainNode>,
}

impl ExplainNode {
    /// Creates a new explain node with the given operator name.
    pub fn new(op: impl Into<String>) -> Self {
        Self {
            op: op.into(),
            props: Vec::new(),
            inputs: Vec::new(),
        }
    }

    fn render_into(&self, depth: usize, out: &mut String) -> fmt::Result {
        write!(out, "{:indent$}{}", "", self.op, indent = depth * 2)?;
        if !self.props.is_empty() {
            out.push_str(" {");
            for (idx, prop) in self.props.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write!(out, "{}: {}", prop.key, prop.value)?;
            }
            out.push('}');
        }
        out.push('\n');
        for input in &self.inputs {
            input.render_into(depth + 1, out)?;
        }
        Ok(())
    }
}

impl fmt::Display for ExplainNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.render_into(0, &mut out)?;
        f.write_str(out.trim_end())
    }
}

/// Single property associated with an [`ExplainNode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplainProp {
    /// Property key.
    pub key: String,
    /// Property value serialized for display.
    pub value: String,
}

impl ExplainProp {
    fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::TraverseOrderOptimizer;
    use crate::query::{CmpOp, FilterNode, FilterOperand, QueryGraph};

    fn graph(aliases: &[&str]) -> QueryGraph {
        let mut qg = QueryGraph::new();
        for alias in aliases {
            qg.add_node(*alias, Vec::<String>::new()).unwrap();
        }
        qg
    }

    fn filter_on(alias: &str) -> FilterTree {
        FilterTree::new(FilterNode::predicate(
            FilterOperand::prop(alias, "id"),
            CmpOp::Eq,
            FilterOperand::lit(7_i64),
        ))
    }

    #[test]
    fn hops_reached_from_their_destination_are_transposed() {
        let qg = graph(&["a", "b", "c"]);
        let exps = vec![
            AlgebraicExpression::hop("a", "b", Some("KNOWS"), None),
            AlgebraicExpression::hop("c", "b", Some("KNOWS"), None),
        ];
        let bound = BTreeSet::new();
        let arrangement = TraverseOrderOptimizer::default()
            .arrange(&qg, &exps, None, &bound)
            .unwrap();
        let plan = TraversalPlan::build(&exps, &arrangement, None, &bound).unwrap();
        let steps = plan.steps();
        assert_eq!(steps[0].input_index, 0);
        assert!(!steps[0].transposed);
        assert!(steps[0].root);
        assert!(steps[1].transposed);
        assert!(!steps[1].root);
        assert_eq!(steps[1].expression.source_alias().as_str(), "b");
        assert_eq!(steps[1].expression.dest_alias().as_str(), "c");
    }

    #[test]
    fn root_starts_from_the_filtered_end() {
        let qg = graph(&["a", "b"]);
        let exps = vec![AlgebraicExpression::hop("a", "b", None, None)];
        let filters = filter_on("b");
        let bound = BTreeSet::new();
        let arrangement = TraverseOrderOptimizer::default()
            .arrange(&qg, &exps, Some(&filters), &bound)
            .unwrap();
        let plan = TraversalPlan::build(&exps, &arrangement, Some(&filters), &bound).unwrap();
        assert!(plan.steps()[0].transposed);
        assert_eq!(plan.steps()[0].expression.source_alias().as_str(), "b");
    }

    #[test]
    fn bound_destination_is_resolved_up_front() {
        let qg = graph(&["a", "b"]);
        let exps = vec![AlgebraicExpression::hop("a", "b", None, None)];
        let bound = BTreeSet::from([Alias::new("b")]);
        let arrangement = TraverseOrderOptimizer::default()
            .arrange(&qg, &exps, None, &bound)
            .unwrap();
        let plan = TraversalPlan::build(&exps, &arrangement, None, &bound).unwrap();
        assert!(plan.steps()[0].transposed);
        assert_eq!(plan.score(), 1);
    }

    #[test]
    fn explain_nests_steps_and_splits_components() {
        let qg = graph(&["a", "b", "c", "x", "y"]);
        let exps = vec![
            AlgebraicExpression::hop("a", "b", Some("KNOWS"), None),
            AlgebraicExpression::hop("x", "y", Some("ROAD"), None),
            AlgebraicExpression::hop("b", "c", Some("KNOWS"), None),
        ];
        let bound = BTreeSet::new();
        let arrangement = TraverseOrderOptimizer::default()
            .arrange(&qg, &exps, None, &bound)
            .unwrap();
        let plan = TraversalPlan::build(&exps, &arrangement, None, &bound).unwrap();
        let explain = plan.explain();
        assert_eq!(explain.op, "TraversalPlan");
        let product = &explain.inputs[0];
        assert_eq!(product.op, "CartesianProduct");
        assert_eq!(product.inputs.len(), 2);
        assert_eq!(product.inputs[0].op, "Traverse");
        assert_eq!(product.inputs[0].inputs[0].op, "ScanTraverse");
        assert_eq!(product.inputs[1].op, "ScanTraverse");
        let rendered = explain.to_string();
        assert!(rendered.starts_with("TraversalPlan {score: 0"));
        assert!(rendered.contains("    ScanTraverse {expr: KNOWS(a->b)"));
    }
}
