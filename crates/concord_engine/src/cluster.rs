//! Constrained cluster search.
//!
//! Clusters are cliques of the compatibility graph that also satisfy a
//! cluster rule set. The search is a Bron–Kerbosch enumeration over
//! `(R, P, X)` run on an explicit work stack:
//!
//! - `R` holds the items committed to the current candidate
//! - `P` holds common neighbours of `R` not yet tried in this branch
//! - `X` holds common neighbours already tried in a sibling branch
//!
//! Candidates are tried in pivot order (most neighbours in `P ∪ X` first)
//! but none are skipped: size caps and rule pruning make the classic pivot
//! cut unsound here.
//!
//! A branch `R ∪ {v}` is entered only if it stays within `max_size` and,
//! once at least `min_size` items, passes every *gating* rule (see
//! [`PruningPolicy`]). A node `R` is emitted when it is within bounds,
//! passes every enabled rule, and no larger clique drawn from `R ∪ P ∪ X`
//! within `max_size` passes every enabled rule too. Deferred rules need not
//! hold on the sets in between, so that check may look more than one item
//! ahead.

use std::collections::HashSet;

use concord_foundation::{Error, ItemId, Result};
use concord_schema::{Catalog, Item};
use im::OrdSet;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{PruningPolicy, SearchConfig};
use crate::graph::CompatibilityGraph;
use crate::relationship::{ClusterRelationship, derive_relationships};
use crate::rule::{ClusterRule, ClusterRuleSet, RuleEvaluation, RuleSet};

// =============================================================================
// Results
// =============================================================================

/// A group of mutually compatible items satisfying the cluster rules.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// Identifier within one search result (`cluster-1`, `cluster-2`, ...).
    pub id: String,
    /// The items. Identity of a cluster is this set.
    pub items: OrdSet<ItemId>,
    /// Number of items.
    pub size: usize,
    /// One evaluation per enabled cluster rule.
    pub evaluations: Vec<RuleEvaluation>,
    /// No larger clique containing these items passes every enabled rule,
    /// regardless of `max_size`.
    pub is_maximal: bool,
    /// No cluster in the same result is larger.
    pub is_maximum: bool,
}

impl Cluster {
    /// Returns true if the cluster contains the item.
    #[must_use]
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains(id)
    }

    /// Returns true if every item of this cluster is in `other`.
    #[must_use]
    pub fn is_subset_of(&self, other: &Cluster) -> bool {
        self.items.is_subset(&other.items)
    }
}

/// Counters describing the work a search did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchStats {
    /// Pairs evaluated to build the graph.
    pub pairs_evaluated: usize,
    /// Edges in the compatibility graph.
    pub edges: usize,
    /// Search nodes entered.
    pub nodes_visited: usize,
    /// Cluster rule evaluations performed.
    pub rule_evaluations: usize,
    /// Branches cut by size or gating rules.
    pub pruned: usize,
}

/// Outcome of a cluster search.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SearchResult {
    /// Emitted clusters, in emission order.
    pub clusters: Vec<Cluster>,
    /// Relationships between emitted clusters.
    pub relationships: Vec<ClusterRelationship>,
    /// Number of clusters emitted.
    pub total_found: usize,
    /// True if the search stopped at `max_clusters`.
    pub truncated: bool,
    /// Work counters.
    pub stats: SearchStats,
}

impl SearchResult {
    /// Returns the first of the largest clusters, if any.
    #[must_use]
    pub fn largest(&self) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.is_maximum)
    }

    /// Looks up a cluster by id.
    #[must_use]
    pub fn cluster(&self, id: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Iterates the clusters containing an item.
    pub fn clusters_with<'a>(&'a self, item: &'a ItemId) -> impl Iterator<Item = &'a Cluster> {
        self.clusters.iter().filter(move |c| c.contains(item))
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Finds clusters in a catalog.
///
/// Validates the catalog against its schema, builds the compatibility graph
/// from `pair_rules`, then searches it under `cluster_rules` and `config`.
///
/// # Errors
/// Returns a schema validation error for the first invalid item, or a
/// configuration error if the search parameters are invalid, the cluster
/// rule set names a different pairwise rule set, a rule references a field
/// the schema does not declare, or any rule fails to evaluate. No partial
/// result is returned.
pub fn find_clusters(
    catalog: &Catalog,
    pair_rules: &RuleSet,
    cluster_rules: &ClusterRuleSet,
    config: &SearchConfig,
) -> Result<SearchResult> {
    config.validate()?;
    if cluster_rules.pairwise_ruleset != pair_rules.name {
        return Err(Error::invalid_search(format!(
            "cluster rule set `{}` is defined over `{}`, not `{}`",
            cluster_rules.name, cluster_rules.pairwise_ruleset, pair_rules.name
        )));
    }
    catalog.validate_strict()?;
    pair_rules.check_fields(catalog.schema())?;
    cluster_rules.check_fields(catalog.schema())?;

    let graph = CompatibilityGraph::build(catalog, pair_rules)
        .map_err(|e| e.in_source(&pair_rules.name))?;
    search(catalog, &graph, cluster_rules, config)
}

/// Searches a prebuilt compatibility graph.
///
/// The graph's nodes must be the catalog's items in catalog order.
///
/// # Errors
/// Returns a schema validation error for the first invalid item, or a
/// configuration error if the search parameters are invalid, the graph does
/// not match the catalog, a rule references an undeclared field, or a
/// cluster rule fails to evaluate.
pub fn search_graph(
    catalog: &Catalog,
    graph: &CompatibilityGraph,
    rules: &ClusterRuleSet,
    config: &SearchConfig,
) -> Result<SearchResult> {
    config.validate()?;
    catalog.validate_strict()?;
    rules.check_fields(catalog.schema())?;
    if graph.ids().len() != catalog.len()
        || graph
            .ids()
            .iter()
            .zip(catalog.items())
            .any(|(id, item)| *id != item.id)
    {
        return Err(Error::invalid_search(
            "compatibility graph was not built from this catalog",
        ));
    }
    search(catalog, graph, rules, config)
}

fn search(
    catalog: &Catalog,
    graph: &CompatibilityGraph,
    rules: &ClusterRuleSet,
    config: &SearchConfig,
) -> Result<SearchResult> {
    let mut search = Search::new(catalog.items(), graph, rules, config);
    search.run().map_err(|e| e.in_source(&rules.name))?;
    let result = search.finish();

    debug!(
        catalog = catalog.name(),
        ruleset = %rules.name,
        items = catalog.len(),
        edges = result.stats.edges,
        nodes = result.stats.nodes_visited,
        pruned = result.stats.pruned,
        clusters = result.total_found,
        truncated = result.truncated,
        "cluster search finished"
    );
    Ok(result)
}

/// Evaluates every enabled cluster rule against an arbitrary set of items.
///
/// # Errors
/// Returns `ConfigError::UnknownItem` if an id is not in the catalog, or a
/// configuration error if a rule fails to evaluate.
pub fn evaluate_cluster<'a, I>(
    catalog: &Catalog,
    ids: I,
    rules: &ClusterRuleSet,
) -> Result<Vec<RuleEvaluation>>
where
    I: IntoIterator<Item = &'a ItemId>,
{
    let items = ids
        .into_iter()
        .map(|id| catalog.require(id))
        .collect::<Result<Vec<&Item>>>()?;
    rules
        .evaluate(&items)
        .map_err(|e| e.in_source(&rules.name))
}

// =============================================================================
// Search
// =============================================================================

/// One level of the work stack.
struct Frame {
    r: OrdSet<usize>,
    p: OrdSet<usize>,
    x: OrdSet<usize>,
    order: Vec<usize>,
    next: usize,
}

struct Emitted {
    members: OrdSet<usize>,
    evaluations: Vec<RuleEvaluation>,
    is_maximal: bool,
}

struct Search<'a> {
    items: &'a [Item],
    graph: &'a CompatibilityGraph,
    rules: Vec<&'a ClusterRule>,
    gating: Vec<&'a ClusterRule>,
    deferred: Vec<&'a ClusterRule>,
    config: &'a SearchConfig,
    seen: HashSet<OrdSet<usize>>,
    emitted: Vec<Emitted>,
    stats: SearchStats,
    truncated: bool,
}

impl<'a> Search<'a> {
    fn new(
        items: &'a [Item],
        graph: &'a CompatibilityGraph,
        rules: &'a ClusterRuleSet,
        config: &'a SearchConfig,
    ) -> Self {
        let enabled: Vec<&ClusterRule> = rules.enabled_rules().collect();
        let (gating, deferred): (Vec<&ClusterRule>, Vec<&ClusterRule>) = enabled
            .iter()
            .copied()
            .partition(|rule| rule.gates(config.pruning));
        if config.pruning == PruningPolicy::HereditaryOnly {
            for rule in rules.deferred_rules() {
                debug!(rule = %rule.name, "rule checked only on complete candidates");
            }
        }

        Self {
            items,
            graph,
            rules: enabled,
            gating,
            deferred,
            config,
            seen: HashSet::new(),
            emitted: Vec::new(),
            stats: SearchStats {
                pairs_evaluated: graph.pairs_evaluated(),
                edges: graph.edge_count(),
                ..SearchStats::default()
            },
            truncated: false,
        }
    }

    fn run(&mut self) -> Result<()> {
        let everything: OrdSet<usize> = (0..self.items.len()).collect();
        let root = self.enter(OrdSet::new(), everything, OrdSet::new())?;
        let mut stack = vec![root];

        while !self.truncated {
            let Some(frame) = stack.last_mut() else {
                break;
            };
            let Some(&v) = frame.order.get(frame.next) else {
                stack.pop();
                continue;
            };
            frame.next += 1;

            let extended = frame.r.update(v);
            let child = if self.admits(&extended)? {
                let neighbors = self.graph.neighbors(v);
                Some((
                    extended,
                    frame.p.clone().intersection(neighbors.clone()),
                    frame.x.clone().intersection(neighbors),
                ))
            } else {
                self.stats.pruned += 1;
                trace!(size = extended.len(), item = v, "pruned branch");
                None
            };
            frame.p.remove(&v);
            frame.x.insert(v);

            if let Some((r, p, x)) = child {
                let next = self.enter(r, p, x)?;
                stack.push(next);
            }
        }
        Ok(())
    }

    fn enter(&mut self, r: OrdSet<usize>, p: OrdSet<usize>, x: OrdSet<usize>) -> Result<Frame> {
        self.stats.nodes_visited += 1;
        if r.len() >= self.config.min_size {
            self.consider(&r, &p, &x)?;
        }
        let order = if r.len() >= self.config.max_size {
            Vec::new()
        } else {
            self.pivot_order(&p, &x)
        };
        Ok(Frame {
            r,
            p,
            x,
            order,
            next: 0,
        })
    }

    /// Candidates by descending neighbour count within `P ∪ X`, ties by
    /// catalog position.
    fn pivot_order(&self, p: &OrdSet<usize>, x: &OrdSet<usize>) -> Vec<usize> {
        let pool = p.clone().union(x.clone());
        let mut scored: Vec<(usize, usize)> = p
            .iter()
            .map(|&v| {
                let adj = self.graph.neighbors(v);
                (v, pool.iter().filter(|u| adj.contains(*u)).count())
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.into_iter().map(|(v, _)| v).collect()
    }

    /// Whether a branch may be entered.
    fn admits(&mut self, set: &OrdSet<usize>) -> Result<bool> {
        if set.len() > self.config.max_size {
            return Ok(false);
        }
        if set.len() < self.config.min_size {
            return Ok(true);
        }
        self.passes_gating(set)
    }

    fn passes_gating(&mut self, set: &OrdSet<usize>) -> Result<bool> {
        let members = self.members(set);
        for rule in &self.gating {
            self.stats.rule_evaluations += 1;
            if !rule.evaluate(&members)?.passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn consider(
        &mut self,
        r: &OrdSet<usize>,
        p: &OrdSet<usize>,
        x: &OrdSet<usize>,
    ) -> Result<()> {
        if self.seen.contains(r) {
            return Ok(());
        }

        let members = self.members(r);
        let mut evaluations = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            self.stats.rule_evaluations += 1;
            evaluations.push(rule.evaluate(&members)?);
        }
        if !evaluations.iter().all(|e| e.passed) {
            return Ok(());
        }

        let common = p.clone().union(x.clone());
        if self.has_valid_superset(r, &common, self.config.max_size)? {
            return Ok(());
        }
        let is_maximal = self.config.max_size == usize::MAX
            || !self.has_valid_superset(r, &common, usize::MAX)?;

        self.seen.insert(r.clone());
        self.emitted.push(Emitted {
            members: r.clone(),
            evaluations,
            is_maximal,
        });
        if self.emitted.len() >= self.config.max_clusters {
            self.truncated = true;
        }
        Ok(())
    }

    fn passes_deferred(&mut self, set: &OrdSet<usize>) -> Result<bool> {
        let members = self.members(set);
        for rule in &self.deferred {
            self.stats.rule_evaluations += 1;
            if !rule.evaluate(&members)?.passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Whether some clique `R ∪ T`, with `T` a non-empty subset of the
    /// common neighbours and at most `cap` items in total, passes every
    /// enabled rule.
    ///
    /// Growth stops at any set failing a gating rule. When nothing is
    /// deferred the first gated extension answers the question.
    fn has_valid_superset(
        &mut self,
        r: &OrdSet<usize>,
        common: &OrdSet<usize>,
        cap: usize,
    ) -> Result<bool> {
        let mut stack = vec![(r.clone(), common.clone())];
        while let Some((base, mut pool)) = stack.pop() {
            if base.len() >= cap {
                continue;
            }
            while let Some(v) = pool.get_min().copied() {
                pool.remove(&v);
                let grown = base.update(v);
                if !self.passes_gating(&grown)? {
                    continue;
                }
                if self.passes_deferred(&grown)? {
                    return Ok(true);
                }
                let rest = pool.clone().intersection(self.graph.neighbors(v));
                if !rest.is_empty() {
                    stack.push((grown, rest));
                }
            }
        }
        Ok(false)
    }

    fn members(&self, set: &OrdSet<usize>) -> Vec<&'a Item> {
        let items = self.items;
        set.iter().map(|&i| &items[i]).collect()
    }

    fn finish(self) -> SearchResult {
        let largest = self
            .emitted
            .iter()
            .map(|e| e.members.len())
            .max()
            .unwrap_or(0);
        let clusters: Vec<Cluster> = self
            .emitted
            .into_iter()
            .enumerate()
            .map(|(n, e)| Cluster {
                id: format!("cluster-{}", n + 1),
                items: e.members.iter().map(|&i| self.items[i].id.clone()).collect(),
                size: e.members.len(),
                evaluations: e.evaluations,
                is_maximal: e.is_maximal,
                is_maximum: e.members.len() == largest,
            })
            .collect();
        let relationships = derive_relationships(&clusters);

        SearchResult {
            total_found: clusters.len(),
            clusters,
            relationships,
            truncated: self.truncated,
            stats: self.stats,
        }
    }
}
