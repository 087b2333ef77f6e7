//! Search properties over generated catalogs
//!
//! Every emitted cluster is a valid clique within the size bounds, results
//! are duplicate-free and deterministic, truncation is exact, and without
//! cluster rules every item lands in some maximal cluster. On small catalogs
//! the search matches a brute-force scan of every subset.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use concord::engine::{
    ClusterCondition, ClusterRule, ClusterRuleSet, CompatibilityGraph, Condition, Rule, RuleSet,
    SearchConfig, evaluate_cluster, find_clusters,
};
use concord::foundation::{ItemId, Type};
use concord::schema::{Catalog, Dimension, Item, Schema};
use proptest::prelude::*;

const ZONES: [&str; 4] = ["head", "torso", "legs", "feet"];
const CATEGORIES: [&str; 5] = ["hat", "top", "knit", "bottom", "shoes"];

type Garment = (usize, i64, usize, i64);

fn garment() -> impl Strategy<Value = Garment> {
    (0..ZONES.len(), 0i64..3, 0..CATEGORIES.len(), 1i64..=5)
}

fn catalog(garments: &[Garment]) -> Catalog {
    let schema = Schema::new(
        "wardrobe",
        "1",
        vec![
            Dimension::required("body_zone", Type::enumeration(ZONES)),
            Dimension::required("layer", Type::Integer),
            Dimension::required("category", Type::enumeration(CATEGORIES)),
            Dimension::required("formality", Type::Real).with_range(1.0, 5.0),
        ],
    )
    .unwrap();
    let items = garments
        .iter()
        .enumerate()
        .map(|(i, &(zone, layer, category, formality))| {
            Item::new(format!("g{i}"), format!("Garment {i}"))
                .with("body_zone", ZONES[zone])
                .with("layer", layer)
                .with("category", CATEGORIES[category])
                .with("formality", formality)
        })
        .collect();
    Catalog::new("generated", Arc::new(schema), items).unwrap()
}

fn pair_rules() -> RuleSet {
    RuleSet::new("layering", "1", "wardrobe")
        .with_rule(Rule::exclusion(
            "same-slot",
            Condition::conflicting_layers("body_zone", "layer"),
        ))
        .with_rule(Rule::requirement(
            "formality-close",
            Condition::within("formality", 2.0),
        ))
}

fn cluster_rules(with_rules: bool) -> ClusterRuleSet {
    let rules = ClusterRuleSet::new("outfits", "1", "wardrobe", "layering");
    if !with_rules {
        return rules;
    }
    rules
        .with_rule(ClusterRule::requirement(
            "one-per-category",
            ClusterCondition::unique_values("category"),
        ))
        .with_rule(ClusterRule::requirement(
            "two-zones",
            ClusterCondition::count_distinct("body_zone", Some(2), None),
        ))
}

/// Rules whose verdict can flip back and forth as a set grows, next to a
/// hereditary one that still prunes.
fn bounded_rules() -> ClusterRuleSet {
    ClusterRuleSet::new("outfits", "1", "wardrobe", "layering")
        .with_rule(ClusterRule::requirement(
            "one-per-category",
            ClusterCondition::unique_values("category"),
        ))
        .with_rule(ClusterRule::requirement(
            "two-or-three-zones",
            ClusterCondition::count_distinct("body_zone", Some(2), Some(3)),
        ))
        .with_rule(ClusterRule::requirement(
            "light-layering",
            ClusterCondition::sum_range("layer", Some(1.0), Some(3.0)),
        ))
}

/// Every clique of the catalog that passes all cluster rules.
fn valid_cliques<'a>(catalog: &'a Catalog, rules: &ClusterRuleSet) -> Vec<BTreeSet<&'a ItemId>> {
    let graph = CompatibilityGraph::build(catalog, &pair_rules()).unwrap();
    let ids: Vec<&ItemId> = catalog.items().iter().map(|item| &item.id).collect();
    let mut valid = Vec::new();
    for mask in 1u32..(1u32 << ids.len()) {
        let set: BTreeSet<&ItemId> = ids
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1u32 << i) != 0)
            .map(|(_, id)| *id)
            .collect();
        let clique = set
            .iter()
            .all(|a| set.iter().all(|b| a == b || graph.are_compatible(a, b)));
        if clique
            && evaluate_cluster(catalog, set.iter().copied(), rules)
                .unwrap()
                .iter()
                .all(|e| e.passed)
        {
            valid.push(set);
        }
    }
    valid
}

proptest! {
    #[test]
    fn search_matches_brute_force(
        garments in prop::collection::vec(garment(), 0..=8),
        max_size in 1usize..=5,
    ) {
        let catalog = catalog(&garments);
        let rules = bounded_rules();
        let config = SearchConfig::exhaustive().with_max_size(max_size);
        let result = find_clusters(&catalog, &pair_rules(), &rules, &config).unwrap();
        prop_assert!(!result.truncated);

        let valid = valid_cliques(&catalog, &rules);
        let expected: BTreeSet<&BTreeSet<&ItemId>> = valid
            .iter()
            .filter(|s| s.len() <= max_size)
            .filter(|s| {
                !valid
                    .iter()
                    .any(|t| t.len() <= max_size && t.len() > s.len() && t.is_superset(s))
            })
            .collect();
        let found: BTreeSet<BTreeSet<&ItemId>> = result
            .clusters
            .iter()
            .map(|c| c.items.iter().collect())
            .collect();
        prop_assert_eq!(found.len(), result.clusters.len());
        prop_assert_eq!(found.iter().collect::<BTreeSet<_>>(), expected);

        for cluster in &result.clusters {
            let items: BTreeSet<&ItemId> = cluster.items.iter().collect();
            let extendable = valid
                .iter()
                .any(|t| t.len() > items.len() && t.is_superset(&items));
            prop_assert_eq!(cluster.is_maximal, !extendable);
        }
    }

    #[test]
    fn emitted_clusters_are_sound(
        garments in prop::collection::vec(garment(), 0..9),
        min_size in 1usize..=3,
        extra in 0usize..=3,
        max_clusters in 1usize..30,
        with_rules in any::<bool>(),
    ) {
        let catalog = catalog(&garments);
        let rules = cluster_rules(with_rules);
        let config = SearchConfig::default()
            .with_size_range(min_size, min_size + extra)
            .with_max_clusters(max_clusters);
        let result = find_clusters(&catalog, &pair_rules(), &rules, &config).unwrap();
        let graph = CompatibilityGraph::build(&catalog, &pair_rules()).unwrap();

        prop_assert_eq!(result.total_found, result.clusters.len());
        prop_assert!(result.total_found <= max_clusters);
        prop_assert_eq!(result.truncated, result.total_found == max_clusters);

        let largest = result.clusters.iter().map(|c| c.size).max().unwrap_or(0);
        let mut seen = HashSet::new();
        for cluster in &result.clusters {
            prop_assert!(seen.insert(cluster.items.clone()));
            prop_assert!(cluster.size >= config.min_size);
            prop_assert!(cluster.size <= config.max_size);
            prop_assert_eq!(cluster.is_maximum, cluster.size == largest);
            for a in &cluster.items {
                for b in &cluster.items {
                    prop_assert!(a == b || graph.are_compatible(a, b));
                }
            }
            let evaluations = evaluate_cluster(&catalog, &cluster.items, &rules).unwrap();
            prop_assert!(evaluations.iter().all(|e| e.passed));
        }

        for rel in &result.relationships {
            let first = result.cluster(&rel.first).unwrap();
            let second = result.cluster(&rel.second).unwrap();
            prop_assert!(!rel.shared.is_empty());
            prop_assert_eq!(
                &rel.shared,
                &first.items.clone().intersection(second.items.clone())
            );
        }
    }

    #[test]
    fn search_is_deterministic(
        garments in prop::collection::vec(garment(), 0..8),
        with_rules in any::<bool>(),
    ) {
        let catalog = catalog(&garments);
        let config = SearchConfig::default().with_size_range(1, 4);
        let first = find_clusters(&catalog, &pair_rules(), &cluster_rules(with_rules), &config).unwrap();
        let second = find_clusters(&catalog, &pair_rules(), &cluster_rules(with_rules), &config).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_item_is_in_a_maximal_clique(garments in prop::collection::vec(garment(), 1..8)) {
        let catalog = catalog(&garments);
        let result = find_clusters(
            &catalog,
            &pair_rules(),
            &cluster_rules(false),
            &SearchConfig::exhaustive(),
        )
        .unwrap();

        prop_assert!(result.clusters.iter().all(|c| c.is_maximal));
        let covered: HashSet<&ItemId> = result.clusters.iter().flat_map(|c| c.items.iter()).collect();
        prop_assert_eq!(covered.len(), catalog.len());
    }

    #[test]
    fn not_inverts_every_operator(a in garment(), b in garment()) {
        let catalog = catalog(&[a, b]);
        let (x, y) = (&catalog.items()[0], &catalog.items()[1]);
        for cond in [
            Condition::equals("category"),
            Condition::has_different("layer"),
            Condition::within("formality", 1.0),
            Condition::any_equals("body_zone", "torso"),
            Condition::overlaps("body_zone"),
            Condition::conflicting_layers("body_zone", "layer"),
        ] {
            let plain = cond.evaluate(x, y).unwrap().holds;
            let negated = Condition::not(cond.clone()).evaluate(x, y).unwrap().holds;
            prop_assert_eq!(negated, !plain);
            prop_assert_eq!(cond.evaluate(y, x).unwrap().holds, plain);
        }
    }
}
