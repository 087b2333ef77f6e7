//! Integration tests for cluster search
//!
//! Tests clique enumeration over a real pairwise rule set, rule pruning,
//! deferred rules, size caps, relationships, and re-evaluation of emitted
//! clusters.

use std::collections::HashSet;
use std::sync::Arc;

use concord_engine::{
    ClusterCondition, ClusterRule, ClusterRuleSet, CompatibilityGraph, Condition, PruningPolicy,
    RelationshipKind, Rule, RuleSet, SearchConfig, SearchResult, evaluate_cluster, find_clusters,
    search_graph,
};
use concord_foundation::{ItemId, Type};
use concord_schema::{Catalog, Dimension, Item, Schema};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(
            "wardrobe",
            "1",
            vec![
                Dimension::required("body_zone", Type::enumeration(["head", "torso", "legs", "feet"])),
                Dimension::required("layer", Type::Integer).with_range(0.0, 5.0),
                Dimension::required("category", Type::Text),
                Dimension::required("formality", Type::Real).with_range(1.0, 5.0),
            ],
        )
        .unwrap(),
    )
}

fn garment(id: &str, zone: &str, layer: i64, category: &str, formality: f64) -> Item {
    Item::new(id, id)
        .with("body_zone", zone)
        .with("layer", layer)
        .with("category", category)
        .with("formality", formality)
}

/// Compatible pairs: tee, sweater, jeans, and boots are all mutually
/// compatible; loafers go only with the sweater.
fn closet() -> Catalog {
    Catalog::new(
        "closet",
        schema(),
        vec![
            garment("tee", "torso", 1, "top", 2.0),
            garment("sweater", "torso", 2, "top", 3.0),
            garment("jeans", "legs", 1, "bottom", 2.0),
            garment("boots", "feet", 1, "shoes", 3.0),
            garment("loafers", "feet", 1, "shoes", 4.0),
        ],
    )
    .unwrap()
}

fn layering() -> RuleSet {
    RuleSet::new("layering", "1", "wardrobe")
        .with_rule(Rule::exclusion(
            "same-slot",
            Condition::all(vec![
                Condition::equals("body_zone"),
                Condition::not(Condition::has_different("layer")),
            ]),
        ))
        .with_rule(Rule::requirement(
            "formality-close",
            Condition::within("formality", 1.0),
        ))
}

fn outfits() -> ClusterRuleSet {
    ClusterRuleSet::new("outfits", "1", "wardrobe", "layering")
}

fn one_per_category() -> ClusterRule {
    ClusterRule::requirement(
        "one-per-category",
        ClusterCondition::unique_values("category"),
    )
}

fn names(result: &SearchResult) -> Vec<Vec<&str>> {
    result
        .clusters
        .iter()
        .map(|c| c.items.iter().map(ItemId::as_str).collect())
        .collect()
}

fn assert_sound(catalog: &Catalog, rules: &ClusterRuleSet, config: &SearchConfig, result: &SearchResult) {
    let graph = CompatibilityGraph::build(catalog, &layering()).unwrap();
    let mut seen = HashSet::new();
    for cluster in &result.clusters {
        assert!(seen.insert(cluster.items.clone()), "duplicate {}", cluster.id);
        assert!(cluster.size >= config.min_size && cluster.size <= config.max_size);
        assert_eq!(cluster.size, cluster.items.len());
        for a in &cluster.items {
            for b in &cluster.items {
                assert!(a == b || graph.are_compatible(a, b));
            }
        }
        let evaluations = evaluate_cluster(catalog, &cluster.items, rules).unwrap();
        assert!(evaluations.iter().all(|e| e.passed), "{}", cluster.id);
        assert_eq!(evaluations, cluster.evaluations);
    }
}

// =============================================================================
// Unconstrained Search
// =============================================================================

#[test]
fn maximal_cliques_without_cluster_rules() {
    let catalog = closet();
    let config = SearchConfig::default();
    let result = find_clusters(&catalog, &layering(), &outfits(), &config).unwrap();

    assert_eq!(
        names(&result),
        vec![vec!["boots", "jeans", "sweater", "tee"], vec!["loafers", "sweater"]]
    );
    assert!(result.clusters.iter().all(|c| c.is_maximal));
    assert_eq!(result.largest().map(|c| c.id.as_str()), Some("cluster-1"));
    assert!(!result.clusters[1].is_maximum);
    assert_eq!(result.stats.pairs_evaluated, 10);
    assert_eq!(result.stats.edges, 7);
    assert_sound(&catalog, &outfits(), &config, &result);
}

#[test]
fn size_cap_emits_every_compatible_pair() {
    let catalog = closet();
    let config = SearchConfig::default().with_size_range(2, 2);
    let result = find_clusters(&catalog, &layering(), &outfits(), &config).unwrap();

    assert_eq!(result.total_found, 7);
    let maximal: Vec<&str> = result
        .clusters
        .iter()
        .filter(|c| c.is_maximal)
        .flat_map(|c| c.items.iter().map(ItemId::as_str))
        .collect();
    assert_eq!(maximal, vec!["loafers", "sweater"]);
    assert_sound(&catalog, &outfits(), &config, &result);
}

// =============================================================================
// Rule Pruning
// =============================================================================

#[test]
fn hereditary_rule_splits_cliques() {
    let catalog = closet();
    let rules = outfits().with_rule(one_per_category());
    let config = SearchConfig::default();
    let result = find_clusters(&catalog, &layering(), &rules, &config).unwrap();

    assert_eq!(
        names(&result),
        vec![
            vec!["boots", "jeans", "sweater"],
            vec!["loafers", "sweater"],
            vec!["boots", "jeans", "tee"],
        ]
    );
    assert!(result.stats.pruned > 0);
    assert!(result.clusters.iter().all(|c| c.is_maximal));
    assert_eq!(
        result.clusters.iter().filter(|c| c.is_maximum).count(),
        2
    );
    assert_sound(&catalog, &rules, &config, &result);
}

#[test]
fn relationships_between_emitted_clusters() {
    let rules = outfits().with_rule(one_per_category());
    let result = find_clusters(&closet(), &layering(), &rules, &SearchConfig::default()).unwrap();

    let summary: Vec<(&str, &str, RelationshipKind, usize)> = result
        .relationships
        .iter()
        .map(|r| (r.first.as_str(), r.second.as_str(), r.kind, r.shared.len()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("cluster-1", "cluster-2", RelationshipKind::Overlapping, 1),
            ("cluster-1", "cluster-3", RelationshipKind::Overlapping, 2),
        ]
    );

    let sweater = ItemId::new("sweater");
    let with_sweater: Vec<&str> = result.clusters_with(&sweater).map(|c| c.id.as_str()).collect();
    assert_eq!(with_sweater, vec!["cluster-1", "cluster-2"]);
    assert_eq!(result.cluster("cluster-3").map(|c| c.size), Some(3));
}

#[test]
fn upward_rule_is_deferred_not_pruned() {
    let catalog = closet();
    let rules = outfits().with_rule(one_per_category()).with_rule(ClusterRule::requirement(
        "full-outfit",
        ClusterCondition::covers_all("category", ["top", "bottom", "shoes"]),
    ));
    let deferred: Vec<&str> = rules.deferred_rules().map(|r| r.name.as_str()).collect();
    assert_eq!(deferred, vec!["full-outfit"]);

    let config = SearchConfig::default();
    let result = find_clusters(&catalog, &layering(), &rules, &config).unwrap();
    assert_eq!(
        names(&result),
        vec![vec!["boots", "jeans", "sweater"], vec!["boots", "jeans", "tee"]]
    );
    assert_sound(&catalog, &rules, &config, &result);

    let eager = config.with_pruning(PruningPolicy::Eager);
    let result = find_clusters(&catalog, &layering(), &rules, &eager).unwrap();
    assert!(result.clusters.is_empty());
}

#[test]
fn disabled_cluster_rules_are_ignored() {
    let rules = outfits().with_rule(one_per_category().with_enabled(false));
    let result = find_clusters(&closet(), &layering(), &rules, &SearchConfig::default()).unwrap();
    assert_eq!(result.total_found, 2);
    assert!(result.clusters.iter().all(|c| c.evaluations.is_empty()));
}

// =============================================================================
// Limits and Reuse
// =============================================================================

#[test]
fn truncated_search_reports_exact_count() {
    let config = SearchConfig::default().with_size_range(2, 2).with_max_clusters(4);
    let result = find_clusters(&closet(), &layering(), &outfits(), &config).unwrap();
    assert!(result.truncated);
    assert_eq!(result.total_found, 4);
    assert_eq!(result.clusters.len(), 4);
    assert_eq!(result.clusters[3].id, "cluster-4");
}

#[test]
fn prebuilt_graph_gives_same_result() {
    let catalog = closet();
    let rules = outfits().with_rule(one_per_category());
    let config = SearchConfig::default();
    let graph = CompatibilityGraph::build(&catalog, &layering()).unwrap();

    let direct = find_clusters(&catalog, &layering(), &rules, &config).unwrap();
    let reused = search_graph(&catalog, &graph, &rules, &config).unwrap();
    assert_eq!(direct, reused);
}

#[test]
fn exhaustive_preset_keeps_isolated_items() {
    let catalog = Catalog::new(
        "closet",
        schema(),
        vec![
            garment("tee", "torso", 1, "top", 2.0),
            garment("tux", "torso", 1, "top", 5.0),
        ],
    )
    .unwrap();
    let result =
        find_clusters(&catalog, &layering(), &outfits(), &SearchConfig::exhaustive()).unwrap();
    assert_eq!(names(&result), vec![vec!["tee"], vec!["tux"]]);
    assert!(!result.truncated);
}
