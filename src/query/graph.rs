//! Pattern topology as declared by the query.
//!
//! Node and relationship aliases share a single namespace. Maps are ordered so
//! every traversal over the graph is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use crate::query::errors::QueryGraphError;
use crate::types::Alias;

/// Node variable declared in the pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryNode {
    /// Alias bound to matched nodes.
    pub alias: Alias,
    /// Labels the node must carry.
    pub labels: Vec<String>,
}

/// Relationship variable declared in the pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryEdge {
    /// Alias bound to matched relationships.
    pub alias: Alias,
    /// Source node alias.
    pub src: Alias,
    /// Destination node alias.
    pub dest: Alias,
    /// Accepted relationship types; empty means any type.
    pub relation_types: Vec<String>,
}

/// Parsed graph pattern: entities plus the adjacency the query declares.
#[derive(Clone, Debug, Default)]
pub struct QueryGraph {
    nodes: BTreeMap<Alias, QueryNode>,
    edges: BTreeMap<Alias, QueryEdge>,
    incident: BTreeMap<Alias, Vec<Alias>>,
}

impl QueryGraph {
    /// Creates an empty pattern.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a node alias with its labels.
    pub fn add_node<I, S>(
        &mut self,
        alias: impl Into<Alias>,
        labels: I,
    ) -> Result<&mut Self, QueryGraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let alias = alias.into();
        if self.contains(&alias) {
            return Err(QueryGraphError::DuplicateAlias { alias });
        }
        self.incident.insert(alias.clone(), Vec::new());
        self.nodes.insert(
            alias.clone(),
            QueryNode {
                alias,
                labels: labels.into_iter().map(Into::into).collect(),
            },
        );
        Ok(self)
    }

    /// Declares a relationship alias connecting two previously declared nodes.
    pub fn add_edge<I, S>(
        &mut self,
        alias: impl Into<Alias>,
        src: impl Into<Alias>,
        dest: impl Into<Alias>,
        relation_types: I,
    ) -> Result<&mut Self, QueryGraphError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let alias = alias.into();
        let src = src.into();
        let dest = dest.into();
        if self.contains(&alias) {
            return Err(QueryGraphError::DuplicateAlias { alias });
        }
        for endpoint in [&src, &dest] {
            if !self.nodes.contains_key(endpoint) {
                return Err(QueryGraphError::MissingEndpoint {
                    edge: alias,
                    endpoint: endpoint.clone(),
                });
            }
        }
        if let Some(list) = self.incident.get_mut(&src) {
            list.push(alias.clone());
        }
        if src != dest {
            if let Some(list) = self.incident.get_mut(&dest) {
                list.push(alias.clone());
            }
        }
        self.edges.insert(
            alias.clone(),
            QueryEdge {
                alias,
                src,
                dest,
                relation_types: relation_types.into_iter().map(Into::into).collect(),
            },
        );
        Ok(self)
    }

    /// Returns `true` when the alias names a node or a relationship.
    pub fn contains(&self, alias: &Alias) -> bool {
        self.nodes.contains_key(alias) || self.edges.contains_key(alias)
    }

    /// Looks up a node by alias.
    pub fn node(&self, alias: &Alias) -> Option<&QueryNode> {
        self.nodes.get(alias)
    }

    /// Looks up a relationship by alias.
    pub fn edge(&self, alias: &Alias) -> Option<&QueryEdge> {
        self.edges.get(alias)
    }

    /// Iterates nodes in alias order.
    pub fn nodes(&self) -> impl Iterator<Item = &QueryNode> {
        self.nodes.values()
    }

    /// Iterates relationships in alias order.
    pub fn edges(&self) -> impl Iterator<Item = &QueryEdge> {
        self.edges.values()
    }

    /// Number of relationship endpoints attached to the node. Self loops count
    /// twice.
    pub fn degree(&self, alias: &Alias) -> usize {
        self.incident
            .get(alias)
            .map(|edges| {
                edges
                    .iter()
                    .filter_map(|e| self.edges.get(e))
                    .map(|e| if e.src == e.dest { 2 } else { 1 })
                    .sum()
            })
            .unwrap_or(0)
    }

    /// Node aliases directly connected to `alias` by a pattern edge.
    pub fn neighbors(&self, alias: &Alias) -> BTreeSet<&Alias> {
        let mut out = BTreeSet::new();
        let Some(edges) = self.incident.get(alias) else {
            return out;
        };
        for edge in edges.iter().filter_map(|e| self.edges.get(e)) {
            let other = if &edge.src == alias {
                &edge.dest
            } else {
                &edge.src
            };
            out.insert(other);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> QueryGraph {
        let mut qg = QueryGraph::new();
        for alias in ["a", "b", "c", "d"] {
            qg.add_node(alias, ["Person"]).expect("node");
        }
        qg.add_edge("e1", "a", "b", ["KNOWS"]).expect("edge");
        qg.add_edge("e2", "b", "c", ["KNOWS"]).expect("edge");
        qg.add_edge("e3", "c", "d", Vec::<String>::new()).expect("edge");
        qg
    }

    #[test]
    fn rejects_duplicate_aliases_across_namespaces() {
        let mut qg = chain();
        let err = qg.add_node("e1", ["X"]).unwrap_err();
        assert_eq!(err.code(), "DuplicateAlias");
        let err = qg
            .add_edge("a", "b", "c", Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, QueryGraphError::DuplicateAlias { .. }));
    }

    #[test]
    fn rejects_edges_with_undeclared_endpoints() {
        let mut qg = chain();
        let err = qg
            .add_edge("e9", "a", "zz", Vec::<String>::new())
            .unwrap_err();
        assert_eq!(
            err,
            QueryGraphError::MissingEndpoint {
                edge: Alias::new("e9"),
                endpoint: Alias::new("zz"),
            }
        );
    }

    #[test]
    fn degree_and_neighbors_follow_declared_edges() {
        let mut qg = chain();
        qg.add_edge("loop", "d", "d", ["SELF"]).expect("edge");
        assert_eq!(qg.degree(&Alias::new("a")), 1);
        assert_eq!(qg.degree(&Alias::new("b")), 2);
        assert_eq!(qg.degree(&Alias::new("d")), 3);
        let neighbors: Vec<_> = qg
            .neighbors(&Alias::new("c"))
            .into_iter()
            .map(Alias::as_str)
            .collect();
        assert_eq!(neighbors, vec!["b", "d"]);
        assert!(qg.contains(&Alias::new("e2")));
        assert_eq!(qg.edge(&Alias::new("e3")).map(|e| e.relation_types.len()), Some(0));
    }
}
