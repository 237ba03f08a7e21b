//! Connected components over an expression set.
//!
//! Two expressions belong to the same component when they share a source or
//! destination alias, directly or transitively. Components that touch a bound
//! alias are searched together: the bound set connects them, so their hops may
//! interleave. Pieces nothing connects become separate search units, each with
//! its own root.

use rustc_hash::FxHashMap;

use crate::arithmetic::AlgebraicExpression;
use crate::optimizer::context::OrderingContext;
use crate::types::Alias;

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut idx: usize) -> usize {
        while self.parent[idx] != idx {
            self.parent[idx] = self.parent[self.parent[idx]];
            idx = self.parent[idx];
        }
        idx
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Keep the smaller index as representative.
            let (keep, drop) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[drop] = keep;
        }
    }
}

/// Groups expression indices by component.
///
/// Members are listed in input order and components are ordered by their
/// first member.
pub fn partition(exps: &[AlgebraicExpression]) -> Vec<Vec<usize>> {
    let mut sets = DisjointSet::new(exps.len());
    let mut first_seen: FxHashMap<&Alias, usize> = FxHashMap::default();
    for (idx, exp) in exps.iter().enumerate() {
        for alias in exp.entities_referenced() {
            match first_seen.get(alias) {
                Some(&other) => sets.union(idx, other),
                None => {
                    first_seen.insert(alias, idx);
                }
            }
        }
    }
    let mut by_root: Vec<Option<usize>> = vec![None; exps.len()];
    let mut components: Vec<Vec<usize>> = Vec::new();
    for idx in 0..exps.len() {
        let root = sets.find(idx);
        match by_root[root] {
            Some(slot) => components[slot].push(idx),
            None => {
                by_root[root] = Some(components.len());
                components.push(vec![idx]);
            }
        }
    }
    components
}

/// Expressions ordered by one search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchUnit {
    /// Input indices, ascending.
    pub members: Vec<usize>,
    /// Input indices allowed at the first position; empty means any member.
    pub entry: Vec<usize>,
}

/// Search units for one ordering call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitPlan {
    /// Units in evaluation order.
    pub units: Vec<SearchUnit>,
    /// Components touching no bound alias. More than one means no single
    /// connected order exists.
    pub unanchored: usize,
}

/// Groups the components of `exps` into search units.
///
/// Every component touching a bound alias joins the first unit, together with
/// the highest-ranked unanchored component, which must then open the order.
/// Remaining unanchored components follow as units of their own, those
/// touching a filtered alias first, then by earliest input index.
pub fn search_units(exps: &[AlgebraicExpression], ctx: &OrderingContext<'_>) -> UnitPlan {
    let touches = |members: &[usize], pred: &dyn Fn(&Alias) -> bool| {
        members.iter().any(|&idx| {
            exps[idx]
                .entities_referenced()
                .into_iter()
                .any(|alias| pred(alias))
        })
    };
    let (anchored, mut free): (Vec<Vec<usize>>, Vec<Vec<usize>>) = partition(exps)
        .into_iter()
        .partition(|members| touches(members, &|a| ctx.is_bound(a)));
    free.sort_by_key(|members| (!touches(members, &|a| ctx.is_filtered(a)), members[0]));

    let unanchored = free.len();
    let mut free = free.into_iter();
    let opener = if anchored.is_empty() { None } else { free.next() };
    let mut units = Vec::with_capacity(unanchored + 1);
    if !anchored.is_empty() {
        let entry = opener.clone().unwrap_or_default();
        let mut members: Vec<usize> = anchored
            .into_iter()
            .flatten()
            .chain(opener.into_iter().flatten())
            .collect();
        members.sort_unstable();
        units.push(SearchUnit { members, entry });
    }
    units.extend(free.map(|members| SearchUnit {
        members,
        entry: Vec::new(),
    }));
    UnitPlan { units, unanchored }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::config::OptimizerOptions;
    use crate::query::{CmpOp, FilterNode, FilterOperand, FilterTree, QueryGraph};

    fn hop(src: &str, dest: &str) -> AlgebraicExpression {
        AlgebraicExpression::hop(src, dest, None, None)
    }

    #[test]
    fn single_chain_is_one_component() {
        let exps = [hop("a", "b"), hop("c", "d"), hop("b", "c")];
        assert_eq!(partition(&exps), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn disjoint_hops_are_separated_in_first_member_order() {
        let exps = [
            hop("x", "y"),
            hop("a", "b"),
            AlgebraicExpression::label_scan("b", "Person"),
            hop("y", "z"),
        ];
        assert_eq!(partition(&exps), vec![vec![0, 3], vec![1, 2]]);
    }

    #[test]
    fn empty_input_has_no_components() {
        assert!(partition(&[]).is_empty());
    }

    fn units_for(exps: &[AlgebraicExpression], bound: &[&str], filtered: &[&str]) -> UnitPlan {
        let mut qg = QueryGraph::new();
        for exp in exps {
            for alias in exp.entities_referenced() {
                if !qg.contains(alias) {
                    qg.add_node(alias.clone(), Vec::<String>::new()).expect("node");
                }
            }
        }
        let bound: BTreeSet<Alias> = bound.iter().map(|a| Alias::new(*a)).collect();
        let filters = FilterTree::all(filtered.iter().map(|a| {
            FilterNode::predicate(FilterOperand::prop(*a, "p"), CmpOp::Eq, FilterOperand::lit(1_i64))
        }));
        let options = OptimizerOptions::default();
        let ctx = OrderingContext::new(&qg, filters.as_ref(), &bound, &options);
        search_units(exps, &ctx)
    }

    #[test]
    fn bound_aliases_join_their_components() {
        let exps = [hop("x", "y"), hop("y", "q"), hop("u", "v"), hop("v", "w")];
        let plan = units_for(&exps, &["x", "u"], &[]);
        assert_eq!(plan.unanchored, 0);
        assert_eq!(
            plan.units,
            vec![SearchUnit {
                members: vec![0, 1, 2, 3],
                entry: Vec::new(),
            }]
        );
    }

    #[test]
    fn single_unanchored_component_opens_the_shared_unit() {
        let exps = [hop("x", "y"), hop("a", "b"), hop("b", "c")];
        let plan = units_for(&exps, &["b"], &[]);
        assert_eq!(plan.unanchored, 1);
        assert_eq!(plan.units.len(), 1);
        assert_eq!(plan.units[0].members, vec![0, 1, 2]);
        assert_eq!(plan.units[0].entry, vec![0]);
    }

    #[test]
    fn unconnected_components_stay_apart_filtered_first() {
        let exps = [hop("x", "y"), hop("a", "b"), hop("m", "n")];
        let plan = units_for(&exps, &[], &["n"]);
        assert_eq!(plan.unanchored, 3);
        let members: Vec<_> = plan.units.iter().map(|u| u.members.clone()).collect();
        assert_eq!(members, vec![vec![2], vec![0], vec![1]]);
        assert!(plan.units.iter().all(|u| u.entry.is_empty()));
    }
}
