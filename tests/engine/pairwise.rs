//! Integration tests for pairwise evaluation
//!
//! Tests rule polarity, full evaluation lists, the compatibility matrix, and
//! the compatibility graph built from it.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use concord_engine::{
    CompatibilityGraph, Condition, Rule, RuleSet, evaluate_item_against_catalog, evaluate_matrix,
    evaluate_pair, evaluate_pair_at,
};
use concord_foundation::{ConfigError, ItemId, Type};
use concord_schema::{Catalog, Dimension, Item, Schema};

fn schema() -> Arc<Schema> {
    Arc::new(
        Schema::new(
            "wardrobe",
            "1",
            vec![
                Dimension::required("body_zone", Type::enumeration(["torso", "legs"])),
                Dimension::required("layer", Type::Integer).with_range(0.0, 5.0),
                Dimension::optional("formality", Type::Real).with_range(1.0, 5.0),
            ],
        )
        .unwrap(),
    )
}

fn garment(id: &str, zone: &str, layer: i64) -> Item {
    Item::new(id, id).with("body_zone", zone).with("layer", layer)
}

fn same_slot() -> Rule {
    Rule::exclusion(
        "same-zone-needs-different-layer",
        Condition::all(vec![
            Condition::equals("body_zone"),
            Condition::not(Condition::has_different("layer")),
        ]),
    )
}

fn layering() -> RuleSet {
    RuleSet::new("layering", "1", "wardrobe").with_rule(same_slot())
}

fn closet() -> Catalog {
    Catalog::new(
        "closet",
        schema(),
        vec![
            garment("a", "torso", 1),
            garment("b", "torso", 1),
            garment("b2", "torso", 2),
            garment("c", "legs", 1),
        ],
    )
    .unwrap()
}

// =============================================================================
// Single Pairs
// =============================================================================

#[test]
fn same_zone_requires_different_layer() {
    let rules = layering();
    let a = garment("A", "torso", 1);

    let result = evaluate_pair(&a, &garment("B", "torso", 1), &rules).unwrap();
    assert!(!result.compatible);
    assert!(!result.evaluations[0].passed);
    assert!(result.evaluations[0].explanation.starts_with("excluded: "));

    assert!(evaluate_pair(&a, &garment("B", "torso", 2), &rules).unwrap().compatible);

    for layer in 0..=5 {
        let c = garment("C", "legs", layer);
        assert!(evaluate_pair(&a, &c, &rules).unwrap().compatible);
    }
}

#[test]
fn every_enabled_rule_is_reported() {
    let rules = layering()
        .with_rule(Rule::requirement("formal-enough", Condition::within("formality", 1.0)))
        .with_rule(
            Rule::exclusion("never", Condition::equals("body_zone")).with_enabled(false),
        );
    let a = garment("a", "torso", 1);
    let b = garment("b", "torso", 1);

    let result = evaluate_pair(&a, &b, &rules).unwrap();
    let names: Vec<&str> = result.evaluations.iter().map(|e| e.rule.as_str()).collect();
    assert_eq!(names, vec!["same-zone-needs-different-layer", "formal-enough"]);
    assert_eq!(result.failures().count(), 2);
    assert_eq!(
        result.evaluations[1].explanation,
        "not satisfied: formality: missing on a and b"
    );
}

#[test]
fn fixed_timestamp_is_deterministic() {
    let rules = layering();
    let a = garment("a", "torso", 1);
    let b = garment("b", "legs", 3);
    let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);

    let first = evaluate_pair_at(&a, &b, &rules, at).unwrap();
    let second = evaluate_pair_at(&a, &b, &rules, at).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.timestamp, at);
    assert_eq!(first.item1, ItemId::new("a"));
    assert_eq!(first.item2, ItemId::new("b"));
}

#[test]
fn empty_rule_set_is_always_compatible() {
    let rules = RuleSet::new("none", "1", "wardrobe");
    let a = garment("a", "torso", 1);
    let result = evaluate_pair(&a, &a, &rules).unwrap();
    assert!(result.compatible);
    assert!(result.evaluations.is_empty());
    assert!(result.timestamp <= SystemTime::now());
}

// =============================================================================
// Matrix
// =============================================================================

#[test]
fn matrix_visits_each_unordered_pair_once() {
    let matrix = evaluate_matrix(&closet(), &layering()).unwrap();

    assert_eq!(matrix.name, "closet x layering");
    assert_eq!(matrix.stats.total, 6);
    assert_eq!(matrix.stats.compatible, 5);
    assert_eq!(matrix.stats.incompatible, 1);
    assert!((matrix.stats.compatibility_rate - 5.0 / 6.0).abs() < 1e-12);
    assert_eq!(
        matrix.stats.rule_failures.get("same-zone-needs-different-layer"),
        Some(&1)
    );

    let pairs: Vec<(&str, &str)> = matrix
        .results
        .iter()
        .map(|r| (r.item1.as_str(), r.item2.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("a", "b"), ("a", "b2"), ("a", "c"), ("b", "b2"), ("b", "c"), ("b2", "c")]
    );

    let bad: Vec<_> = matrix.incompatible_pairs().collect();
    assert_eq!(bad.len(), 1);
    assert_eq!(bad[0].item1, ItemId::new("a"));
    assert_eq!(bad[0].item2, ItemId::new("b"));
}

#[test]
fn matrix_lookup_either_order() {
    let matrix = evaluate_matrix(&closet(), &layering()).unwrap();
    let c = ItemId::new("c");
    let b2 = ItemId::new("b2");
    assert!(matrix.lookup(&c, &b2).unwrap().compatible);

    let err = matrix.lookup(&c, &ItemId::new("zz")).unwrap_err();
    assert!(matches!(
        err.config_error(),
        Some(ConfigError::UnknownItem(id)) if id.as_str() == "zz"
    ));
}

#[test]
fn matrix_of_tiny_catalogs() {
    let empty = Catalog::new("empty", schema(), Vec::new()).unwrap();
    let matrix = evaluate_matrix(&empty, &layering()).unwrap();
    assert_eq!(matrix.stats.total, 0);
    assert!(matrix.stats.compatibility_rate.abs() < f64::EPSILON);

    let single = Catalog::new("single", schema(), vec![garment("a", "torso", 1)]).unwrap();
    assert!(evaluate_matrix(&single, &layering()).unwrap().results.is_empty());
}

#[test]
fn matrix_rejects_undeclared_fields() {
    let rules = layering().with_rule(Rule::exclusion("brand-clash", Condition::equals("brand")));
    let err = evaluate_matrix(&closet(), &rules).unwrap_err();
    assert!(matches!(
        err.config_error(),
        Some(ConfigError::UndefinedDimension { field, schema: name }) if field == "brand" && name == "wardrobe"
    ));
    assert_eq!(err.context.unwrap().source.as_deref(), Some("brand-clash"));
}

#[test]
fn one_item_against_catalog() {
    let newcomer = garment("b", "torso", 3);
    let results = evaluate_item_against_catalog(&newcomer, &closet(), &layering()).unwrap();
    let others: Vec<&str> = results.iter().map(|r| r.item2.as_str()).collect();
    assert_eq!(others, vec!["a", "b2", "c"]);
    assert!(results.iter().all(|r| r.compatible));
}

// =============================================================================
// Compatibility Graph
// =============================================================================

#[test]
fn graph_matches_matrix() {
    let catalog = closet();
    let rules = layering();
    let graph = CompatibilityGraph::build(&catalog, &rules).unwrap();
    let matrix = evaluate_matrix(&catalog, &rules).unwrap();

    assert_eq!(graph.len(), 4);
    assert_eq!(graph.pairs_evaluated(), matrix.stats.total);
    assert_eq!(graph.edge_count(), matrix.stats.compatible);
    for result in &matrix.results {
        assert_eq!(
            graph.are_compatible(&result.item1, &result.item2),
            result.compatible
        );
    }

    let a = ItemId::new("a");
    let neighbors: Vec<&str> = graph.neighbors_of(&a).into_iter().map(ItemId::as_str).collect();
    assert_eq!(neighbors, vec!["b2", "c"]);
    assert!((graph.density() - 5.0 / 6.0).abs() < 1e-12);
}
