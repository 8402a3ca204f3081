//! Variable-reference dependency graph validation.
//!
//! Builds a directed graph from alias references between variables and
//! detects cycles and dangling targets. Graphs are built fresh from one
//! snapshot of variables per validation request and never mutated afterwards.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use serde::Serialize;

use crate::figma::types::Variable;

/// Adjacency mapping from a variable identifier to the identifiers it
/// references, in mode order.
pub type ReferenceGraph = IndexMap<String, Vec<String>>;

/// What went wrong with one checked variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProblemKind {
    /// The identifier is absent from the variable snapshot.
    NotFound,
    /// Following references from the variable returns to a variable on the
    /// same path.
    CircularReference,
    /// The variable references a target absent from the snapshot.
    DanglingReference {
        /// The missing target identifier.
        target: String,
    },
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "variable not found"),
            Self::CircularReference => write!(f, "circular reference detected"),
            Self::DanglingReference { target } => {
                write!(f, "references missing variable {target}")
            }
        }
    }
}

/// One flagged problem for a checked variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceProblem {
    /// The variable the problem was flagged on.
    pub variable_id: String,
    /// The problem itself.
    #[serde(flatten)]
    pub kind: ProblemKind,
}

/// Builds the reference graph for a snapshot of variables.
///
/// Every variable contributes an adjacency entry; alias-typed variables
/// contribute one edge per distinct referenced identifier. Deterministic
/// given the same input order.
#[must_use]
pub fn build_graph(variables: &[Variable]) -> ReferenceGraph {
    let mut graph = ReferenceGraph::with_capacity(variables.len());
    for variable in variables {
        graph.insert(variable.id.clone(), variable.alias_targets());
    }
    graph
}

/// Whether following references from `start` revisits a node on the current
/// traversal path.
///
/// Uses two traversal sets: `explored` holds nodes whose entire subtree has
/// been checked and found cycle-free; `on_path` holds the nodes of the
/// branch currently being walked. A cycle exists exactly when traversal
/// reaches a node already on the current path. Diamonds (two paths
/// converging on one descendant) and disconnected nodes are not cycles.
#[must_use]
pub fn has_cycle(graph: &ReferenceGraph, start: &str) -> bool {
    let mut explored = HashSet::new();
    let mut on_path = HashSet::new();
    walk(graph, start, &mut explored, &mut on_path)
}

fn walk<'a>(
    graph: &'a ReferenceGraph,
    node: &'a str,
    explored: &mut HashSet<&'a str>,
    on_path: &mut HashSet<&'a str>,
) -> bool {
    if explored.contains(node) {
        return false;
    }
    if !on_path.insert(node) {
        return true;
    }

    if let Some(targets) = graph.get(node) {
        for target in targets {
            if walk(graph, target, explored, on_path) {
                return true;
            }
        }
    }

    on_path.remove(node);
    explored.insert(node);
    false
}

/// Validates the given identifiers against a snapshot of variables.
///
/// For each identifier: flags `NotFound` when absent from the snapshot,
/// `CircularReference` when [`has_cycle`] holds starting from it, and one
/// `DanglingReference` per referenced-but-absent target. Collects every
/// problem instead of stopping at the first; an empty result means valid.
#[must_use]
pub fn validate(variables: &[Variable], ids_to_check: &[String]) -> Vec<ReferenceProblem> {
    let known: HashMap<&str, &Variable> =
        variables.iter().map(|v| (v.id.as_str(), v)).collect();
    let graph = build_graph(variables);

    let mut problems = Vec::new();
    for id in ids_to_check {
        if !known.contains_key(id.as_str()) {
            problems.push(ReferenceProblem {
                variable_id: id.clone(),
                kind: ProblemKind::NotFound,
            });
            continue;
        }

        if has_cycle(&graph, id) {
            problems.push(ReferenceProblem {
                variable_id: id.clone(),
                kind: ProblemKind::CircularReference,
            });
        }

        if let Some(targets) = graph.get(id.as_str()) {
            for target in targets {
                if !known.contains_key(target.as_str()) {
                    problems.push(ReferenceProblem {
                        variable_id: id.clone(),
                        kind: ProblemKind::DanglingReference {
                            target: target.clone(),
                        },
                    });
                }
            }
        }
    }
    problems
}
