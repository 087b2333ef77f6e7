//! Relationships between emitted clusters.

use concord_foundation::ItemId;
use im::OrdSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;

/// How two clusters relate, read as "`first` is a `kind` of `second`".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RelationshipKind {
    /// Every item of `first` is in `second`.
    Subset,
    /// Every item of `second` is in `first`.
    Superset,
    /// They share items but neither contains the other.
    Overlapping,
}

/// A relationship between two clusters of the same result.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterRelationship {
    /// Id of the first cluster.
    pub first: String,
    /// Id of the second cluster.
    pub second: String,
    /// How `first` relates to `second`.
    pub kind: RelationshipKind,
    /// Items in both.
    pub shared: OrdSet<ItemId>,
}

/// Derives relationships between every pair of clusters, in list order.
///
/// Each unordered pair is reported at most once, with `first` earlier in
/// the list. Disjoint pairs are skipped.
#[must_use]
pub fn derive_relationships(clusters: &[Cluster]) -> Vec<ClusterRelationship> {
    let mut relationships = Vec::new();
    for (i, a) in clusters.iter().enumerate() {
        for b in &clusters[i + 1..] {
            let shared = a.items.clone().intersection(b.items.clone());
            if shared.is_empty() {
                continue;
            }
            let kind = if shared.len() == a.items.len() {
                RelationshipKind::Subset
            } else if shared.len() == b.items.len() {
                RelationshipKind::Superset
            } else {
                RelationshipKind::Overlapping
            };
            relationships.push(ClusterRelationship {
                first: a.id.clone(),
                second: b.id.clone(),
                kind,
                shared,
            });
        }
    }
    relationships
}
