//! Condition interpreters, pairwise evaluation, and constrained cluster search
//! for Concord.
//!
//! This crate provides:
//! - [`Condition`] - Pairwise condition trees over two items
//! - [`ClusterCondition`] - Set-level condition trees over a group of items
//! - [`RuleSet`] / [`ClusterRuleSet`] - Exclusion and requirement rules
//! - [`evaluate_pair`] / [`evaluate_matrix`] - Pairwise compatibility
//! - [`CompatibilityGraph`] - The graph induced by a pairwise rule set
//! - [`find_clusters`] - Pruned clique search for valid clusters

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cluster;
pub mod cluster_condition;
pub mod condition;
pub mod config;
pub mod graph;
pub mod monotonicity;
pub mod pairwise;
#[cfg(feature = "serde")]
pub mod parse;
pub mod relationship;
pub mod rule;

pub use cluster::{Cluster, SearchResult, SearchStats, evaluate_cluster, find_clusters, search_graph};
pub use cluster_condition::ClusterCondition;
pub use condition::{Condition, OPERATOR_VERSION, Outcome};
pub use config::{PruningPolicy, SearchConfig};
pub use graph::CompatibilityGraph;
pub use monotonicity::Monotonicity;
pub use pairwise::{
    ComparisonResult, MatrixResult, MatrixStats, evaluate_item_against_catalog, evaluate_matrix,
    evaluate_pair, evaluate_pair_at,
};
pub use relationship::{ClusterRelationship, RelationshipKind, derive_relationships};
pub use rule::{ClusterRule, ClusterRuleSet, Rule, RuleEvaluation, RuleKind, RuleSet};
