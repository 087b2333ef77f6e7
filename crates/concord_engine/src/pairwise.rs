//! Pairwise compatibility evaluation.
//!
//! A pair is compatible iff every enabled rule passes. All enabled rules are
//! evaluated, in declared order, even once the pair is known incompatible,
//! so the evaluation list always explains the whole verdict.

use std::collections::BTreeMap;
use std::time::SystemTime;

use concord_foundation::{ConfigError, Error, ItemId, Result};
use concord_schema::{Catalog, Item};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::rule::{RuleEvaluation, RuleSet};

/// Verdict for one item pair.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ComparisonResult {
    /// First item of the pair.
    pub item1: ItemId,
    /// Second item of the pair.
    pub item2: ItemId,
    /// True iff every evaluation passed.
    pub compatible: bool,
    /// One evaluation per enabled rule, in declared order.
    pub evaluations: Vec<RuleEvaluation>,
    /// When the comparison was made.
    pub timestamp: SystemTime,
}

impl ComparisonResult {
    /// Iterates the evaluations that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RuleEvaluation> {
        self.evaluations.iter().filter(|e| !e.passed)
    }
}

/// Evaluates a pair, stamped with the current time.
///
/// # Errors
/// Returns the first configuration error raised by a rule.
pub fn evaluate_pair(a: &Item, b: &Item, rules: &RuleSet) -> Result<ComparisonResult> {
    evaluate_pair_at(a, b, rules, SystemTime::now())
}

/// Evaluates a pair with an explicit timestamp.
///
/// Identical inputs produce identical results.
///
/// # Errors
/// Returns the first configuration error raised by a rule.
pub fn evaluate_pair_at(
    a: &Item,
    b: &Item,
    rules: &RuleSet,
    timestamp: SystemTime,
) -> Result<ComparisonResult> {
    let evaluations = rules
        .evaluate(a, b)
        .map_err(|e| e.in_source(&rules.name))?;
    Ok(ComparisonResult {
        item1: a.id.clone(),
        item2: b.id.clone(),
        compatible: evaluations.iter().all(|e| e.passed),
        evaluations,
        timestamp,
    })
}

/// Evaluates one item against every other item of a catalog, in catalog
/// order. The item itself is skipped if the catalog contains it.
///
/// # Errors
/// Returns a schema validation error if the item or any catalog item
/// violates the catalog schema, a configuration error if a rule references
/// a field the schema does not declare, or the first rule error.
pub fn evaluate_item_against_catalog(
    item: &Item,
    catalog: &Catalog,
    rules: &RuleSet,
) -> Result<Vec<ComparisonResult>> {
    item.validate(catalog.schema())?;
    catalog.validate_strict()?;
    rules.check_fields(catalog.schema())?;
    let now = SystemTime::now();
    catalog
        .items()
        .iter()
        .filter(|other| other.id != item.id)
        .map(|other| evaluate_pair_at(item, other, rules, now))
        .collect()
}

/// Evaluates every unordered pair of a catalog exactly once.
///
/// Pairs are visited as `(i, j)` with `i < j` in catalog order.
///
/// # Errors
/// Returns the first item's schema validation error, a configuration error
/// if a rule references a field the catalog schema does not declare, or the
/// first rule error.
pub fn evaluate_matrix(catalog: &Catalog, rules: &RuleSet) -> Result<MatrixResult> {
    catalog.validate_strict()?;
    rules.check_fields(catalog.schema())?;

    let items = catalog.items();
    let now = SystemTime::now();
    let mut results = Vec::with_capacity(items.len() * items.len().saturating_sub(1) / 2);
    for (i, a) in items.iter().enumerate() {
        for b in &items[i + 1..] {
            results.push(evaluate_pair_at(a, b, rules, now)?);
        }
    }

    let stats = MatrixStats::from_results(&results);
    debug!(
        catalog = catalog.name(),
        ruleset = %rules.name,
        pairs = stats.total,
        compatible = stats.compatible,
        "evaluated compatibility matrix"
    );

    Ok(MatrixResult {
        name: format!("{} x {}", catalog.name(), rules.name),
        results,
        stats,
    })
}

/// All pairwise verdicts for a catalog.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatrixResult {
    /// Display name (`catalog x ruleset`).
    pub name: String,
    /// One result per unordered pair, in visiting order.
    pub results: Vec<ComparisonResult>,
    /// Aggregate counts.
    pub stats: MatrixStats,
}

impl MatrixResult {
    /// Iterates the incompatible pairs.
    pub fn incompatible_pairs(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter(|r| !r.compatible)
    }

    /// Looks up the result for a pair, in either order.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownItem` naming the first id that appears
    /// in no result.
    pub fn lookup(&self, a: &ItemId, b: &ItemId) -> Result<&ComparisonResult> {
        if let Some(found) = self.results.iter().find(|r| {
            (&r.item1 == a && &r.item2 == b) || (&r.item1 == b && &r.item2 == a)
        }) {
            return Ok(found);
        }
        let known = |id: &ItemId| self.results.iter().any(|r| &r.item1 == id || &r.item2 == id);
        let unknown = if known(a) { b } else { a };
        Err(Error::from(ConfigError::UnknownItem(unknown.clone())))
    }
}

/// Aggregate counts over a matrix.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatrixStats {
    /// Pairs evaluated.
    pub total: usize,
    /// Compatible pairs.
    pub compatible: usize,
    /// Incompatible pairs.
    pub incompatible: usize,
    /// `compatible / total`, or zero when there are no pairs.
    pub compatibility_rate: f64,
    /// Number of pairs each rule failed on, by rule name.
    pub rule_failures: BTreeMap<String, usize>,
}

impl MatrixStats {
    /// Tallies a list of results.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_results(results: &[ComparisonResult]) -> Self {
        let total = results.len();
        let compatible = results.iter().filter(|r| r.compatible).count();
        let mut rule_failures = BTreeMap::new();
        for failure in results.iter().flat_map(ComparisonResult::failures) {
            *rule_failures.entry(failure.rule.clone()).or_insert(0) += 1;
        }
        Self {
            total,
            compatible,
            incompatible: total - compatible,
            compatibility_rate: if total == 0 {
                0.0
            } else {
                compatible as f64 / total as f64
            },
            rule_failures,
        }
    }
}
