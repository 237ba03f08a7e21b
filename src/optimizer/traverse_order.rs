//! Arrangement search.
//!
//! Search units up to [`OptimizerOptions::exhaustive_limit`] expressions
//! (never more than [`MAX_EXHAUSTIVE_LIMIT`]) are searched exhaustively with
//! depth-first backtracking over connectivity-valid permutations. Larger units
//! fall back to a greedy construction that
//! picks, at each position, the valid candidate with the highest incremental
//! score. The greedy result is valid but not guaranteed optimal.

use std::collections::BTreeSet;
use std::hash::Hasher;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};
use xxhash_rust::xxh64::Xxh64;

use crate::arithmetic::{AlgebraicExpression, Operand};
use crate::config::{OptimizerOptions, MAX_EXHAUSTIVE_LIMIT};
use crate::optimizer::components::search_units;
use crate::optimizer::context::OrderingContext;
use crate::optimizer::errors::PlanError;
use crate::query::{FilterTree, QueryGraph};
use crate::types::Alias;

/// How an arrangement was produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SearchMode {
    /// Zero or one expression; returned as given.
    Trivial,
    /// Every component was searched exhaustively; the result is optimal.
    Exhaustive,
    /// At least one component exceeded the exhaustive limit.
    Greedy,
}

/// Counters collected during one search.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SearchStats {
    /// Connected components ordered.
    pub components: usize,
    /// Complete permutations scored by the exhaustive search.
    pub arrangements_scored: u64,
    /// Branches abandoned because no remaining expression was valid.
    pub dead_ends: u64,
    /// Components ordered by the greedy fallback.
    pub greedy_components: usize,
}

/// Chosen evaluation order for a collection of expressions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Arrangement {
    order: Vec<usize>,
    score: i64,
    roots: Vec<usize>,
    mode: SearchMode,
    stats: SearchStats,
}

impl Arrangement {
    /// Input indices in evaluation order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Score of the whole arrangement.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// Positions in [`order`](Self::order) where a component starts.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Search strategy that produced this arrangement.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Search counters.
    pub fn stats(&self) -> &SearchStats {
        &self.stats
    }

    /// Number of expressions arranged.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` when nothing was arranged.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Borrows `exps` in arrangement order.
    pub fn apply<'e>(
        &self,
        exps: &'e [AlgebraicExpression],
    ) -> Result<Vec<&'e AlgebraicExpression>, PlanError> {
        self.check_len(exps.len())?;
        Ok(self.order.iter().map(|&idx| &exps[idx]).collect())
    }

    /// Moves `exps` into arrangement order.
    pub fn into_ordered(
        &self,
        exps: Vec<AlgebraicExpression>,
    ) -> Result<Vec<AlgebraicExpression>, PlanError> {
        self.check_len(exps.len())?;
        let mut slots: Vec<Option<AlgebraicExpression>> = exps.into_iter().map(Some).collect();
        Ok(self
            .order
            .iter()
            .filter_map(|&idx| slots[idx].take())
            .collect())
    }

    /// Deterministic hash of the ordered expressions, suitable as a plan
    /// cache key.
    pub fn fingerprint(&self, exps: &[AlgebraicExpression]) -> Result<u64, PlanError> {
        let ordered = self.apply(exps)?;
        let mut hasher = Xxh64::new(0);
        hasher.write_u64(ordered.len() as u64);
        for exp in ordered {
            hash_expression(exp, &mut hasher);
        }
        Ok(hasher.finish())
    }

    fn check_len(&self, found: usize) -> Result<(), PlanError> {
        if found != self.order.len() {
            return Err(PlanError::ArrangementMismatch {
                expected: self.order.len(),
                found,
            });
        }
        Ok(())
    }
}

/// Orders algebraic expressions for evaluation.
#[derive(Clone, Debug, Default)]
pub struct TraverseOrderOptimizer {
    options: OptimizerOptions,
}

impl TraverseOrderOptimizer {
    /// Creates an optimizer with the given options.
    pub fn new(options: OptimizerOptions) -> Self {
        Self { options }
    }

    /// Options in effect.
    pub fn options(&self) -> &OptimizerOptions {
        &self.options
    }

    /// Computes the best arrangement of `exps`.
    ///
    /// Repeated calls with identical inputs return identical arrangements.
    pub fn arrange(
        &self,
        qg: &QueryGraph,
        exps: &[AlgebraicExpression],
        filters: Option<&FilterTree>,
        bound: &BTreeSet<Alias>,
    ) -> Result<Arrangement, PlanError> {
        let ctx = OrderingContext::new(qg, filters, bound, &self.options);
        ctx.check_preconditions(exps)?;

        if exps.len() <= 1 {
            let order: Vec<usize> = (0..exps.len()).collect();
            let score = ctx.score_arrangement(&exps.iter().collect::<Vec<_>>());
            return Ok(Arrangement {
                roots: order.first().copied().into_iter().collect(),
                order,
                score,
                mode: SearchMode::Trivial,
                stats: SearchStats {
                    components: exps.len(),
                    ..SearchStats::default()
                },
            });
        }

        let plan = search_units(exps, &ctx);
        if plan.unanchored > 1 && !self.options.split_components {
            return Err(PlanError::DisconnectedPattern {
                components: plan.unanchored,
            });
        }
        let limit = self.options.exhaustive_limit.min(MAX_EXHAUSTIVE_LIMIT);
        debug!(
            expressions = exps.len(),
            units = plan.units.len(),
            unanchored = plan.unanchored,
            "ordering traversal expressions"
        );

        let mut stats = SearchStats {
            components: plan.units.len(),
            ..SearchStats::default()
        };
        let mut order = Vec::with_capacity(exps.len());
        let mut roots = Vec::with_capacity(plan.units.len());
        for unit in &plan.units {
            roots.push(order.len());
            let mut search = ComponentSearch::new(&ctx, exps, &unit.members, &unit.entry);
            let ordered = if unit.members.len() <= limit {
                search.exhaustive()
            } else {
                warn!(
                    size = unit.members.len(),
                    limit,
                    "search unit exceeds exhaustive limit; ordering greedily"
                );
                stats.greedy_components += 1;
                search.greedy()
            };
            stats.arrangements_scored += search.arrangements_scored;
            stats.dead_ends += search.dead_ends;
            order.extend(ordered);
        }

        let arranged: Vec<&AlgebraicExpression> = order.iter().map(|&idx| &exps[idx]).collect();
        let score = ctx.score_arrangement(&arranged);
        let mode = if stats.greedy_components > 0 {
            SearchMode::Greedy
        } else {
            SearchMode::Exhaustive
        };
        debug!(score, ?mode, ?order, "selected traversal order");
        Ok(Arrangement {
            order,
            score,
            roots,
            mode,
            stats,
        })
    }

    /// Reorders `exps` in place of the input collection.
    pub fn order(
        &self,
        qg: &QueryGraph,
        exps: Vec<AlgebraicExpression>,
        filters: Option<&FilterTree>,
        bound: &BTreeSet<Alias>,
    ) -> Result<Vec<AlgebraicExpression>, PlanError> {
        let arrangement = self.arrange(qg, &exps, filters, bound)?;
        arrangement.into_ordered(exps)
    }
}

/// Orders `exps` with default options.
pub fn order_expressions(
    qg: &QueryGraph,
    exps: Vec<AlgebraicExpression>,
    filters: Option<&FilterTree>,
    bound: &BTreeSet<Alias>,
) -> Result<Vec<AlgebraicExpression>, PlanError> {
    TraverseOrderOptimizer::default().order(qg, exps, filters, bound)
}

/// Best complete order below a search node, with its score.
type Candidate = (Vec<usize>, i64);

/// Search over the members of one connected component.
struct ComponentSearch<'c, 'a> {
    ctx: &'c OrderingContext<'a>,
    exps: &'c [AlgebraicExpression],
    members: &'c [usize],
    entry: &'c [usize],
    placed: Vec<bool>,
    introduced: FxHashMap<&'c Alias, u32>,
    arrangements_scored: u64,
    dead_ends: u64,
}

impl<'c, 'a> ComponentSearch<'c, 'a> {
    fn new(
        ctx: &'c OrderingContext<'a>,
        exps: &'c [AlgebraicExpression],
        members: &'c [usize],
        entry: &'c [usize],
    ) -> Self {
        Self {
            ctx,
            exps,
            members,
            entry,
            placed: vec![false; members.len()],
            introduced: FxHashMap::default(),
            arrangements_scored: 0,
            dead_ends: 0,
        }
    }

    fn exhaustive(&mut self) -> Vec<usize> {
        let mut prefix = Vec::with_capacity(self.members.len());
        match self.descend(&mut prefix, 0) {
            Some((order, score)) => {
                trace!(score, ?order, "component optimum");
                order
            }
            // Every unit admits a valid order; keep the input order regardless.
            None => self.members.to_vec(),
        }
    }

    /// Extends `prefix` with every valid candidate in member order and
    /// returns the best completion. Ties keep the first one found.
    fn descend(&mut self, prefix: &mut Vec<usize>, partial: i64) -> Option<Candidate> {
        let total = self.members.len();
        if prefix.len() == total {
            self.arrangements_scored += 1;
            return Some((prefix.clone(), partial));
        }
        let (exps, members) = (self.exps, self.members);
        let position = prefix.len();
        let mut best: Option<Candidate> = None;
        let mut extended = false;
        for slot in 0..total {
            if self.placed[slot] {
                continue;
            }
            let idx = members[slot];
            let exp = &exps[idx];
            if !self.reachable(idx, exp, position) {
                continue;
            }
            extended = true;
            let gain = self.ctx.contribution(exp, position, total);
            self.place(slot, exp);
            prefix.push(idx);
            let found = self.descend(prefix, partial + gain);
            prefix.pop();
            self.unplace(slot, exp);
            if let Some(candidate) = found {
                if best.as_ref().map_or(true, |(_, score)| candidate.1 > *score) {
                    best = Some(candidate);
                }
            }
        }
        if !extended {
            self.dead_ends += 1;
        }
        best
    }

    fn greedy(&mut self) -> Vec<usize> {
        let (exps, members) = (self.exps, self.members);
        let total = members.len();
        let mut order = Vec::with_capacity(total);
        for position in 0..total {
            let mut pick: Option<(usize, i64)> = None;
            for slot in 0..total {
                if self.placed[slot] {
                    continue;
                }
                let exp = &exps[members[slot]];
                if !self.reachable(members[slot], exp, position) {
                    continue;
                }
                let gain = self.ctx.contribution(exp, position, total);
                if pick.map_or(true, |(_, best)| gain > best) {
                    pick = Some((slot, gain));
                }
            }
            let slot = match pick {
                Some((slot, _)) => slot,
                None => {
                    // Start over from the first unplaced member.
                    self.dead_ends += 1;
                    match self.placed.iter().position(|placed| !placed) {
                        Some(slot) => slot,
                        None => break,
                    }
                }
            };
            self.place(slot, &exps[members[slot]]);
            order.push(members[slot]);
        }
        order
    }

    fn reachable(&self, idx: usize, exp: &AlgebraicExpression, position: usize) -> bool {
        if position == 0 {
            return self.entry.is_empty() || self.entry.contains(&idx);
        }
        self.ctx
            .connects(exp, |alias| self.introduced.contains_key(alias))
    }

    fn place(&mut self, slot: usize, exp: &'c AlgebraicExpression) {
        self.placed[slot] = true;
        for alias in exp.entities_referenced() {
            *self.introduced.entry(alias).or_insert(0) += 1;
        }
    }

    fn unplace(&mut self, slot: usize, exp: &'c AlgebraicExpression) {
        self.placed[slot] = false;
        for alias in exp.entities_referenced() {
            if let Some(count) = self.introduced.get_mut(alias) {
                *count -= 1;
                if *count == 0 {
                    self.introduced.remove(alias);
                }
            }
        }
    }
}

pub(super) fn hash_expression(exp: &AlgebraicExpression, hasher: &mut Xxh64) {
    hasher.write(exp.source_alias().as_str().as_bytes());
    hasher.write_u8(0xff);
    hasher.write(exp.dest_alias().as_str().as_bytes());
    hasher.write_u8(0xff);
    hasher.write_u64(exp.operands().len() as u64);
    for operand in exp.operands() {
        match operand {
            Operand::Adjacency {
                relation,
                src,
                dest,
                transposed,
            } => {
                hasher.write_u8(0);
                hasher.write(relation.as_deref().unwrap_or("").as_bytes());
                hasher.write_u8(0xff);
                hasher.write(src.as_str().as_bytes());
                hasher.write_u8(0xff);
                hasher.write(dest.as_str().as_bytes());
                hasher.write_u8(*transposed as u8);
            }
            Operand::Label { label, alias } => {
                hasher.write_u8(1);
                hasher.write(label.as_bytes());
                hasher.write_u8(0xff);
                hasher.write(alias.as_str().as_bytes());
            }
            Operand::FilterMask { mask, alias } => {
                hasher.write_u8(2);
                hasher.write(mask.as_bytes());
                hasher.write_u8(0xff);
                hasher.write(alias.as_str().as_bytes());
            }
        }
    }
}
