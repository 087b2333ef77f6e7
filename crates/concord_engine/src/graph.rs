//! The compatibility graph induced by a pairwise rule set.

use concord_foundation::{ItemId, Result};
use concord_schema::Catalog;
use im::OrdSet;

use crate::rule::RuleSet;

/// Undirected graph over catalog positions: an edge joins two items iff
/// the pairwise rule set reports them compatible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompatibilityGraph {
    ids: Vec<ItemId>,
    adjacency: Vec<OrdSet<usize>>,
    pairs_evaluated: usize,
}

impl CompatibilityGraph {
    /// Builds the graph by evaluating every unordered pair once.
    ///
    /// Does not check the rule set's fields against the catalog schema;
    /// callers that need that call [`RuleSet::check_fields`] first.
    ///
    /// # Errors
    /// Returns the first configuration error raised by a rule.
    pub fn build(catalog: &Catalog, rules: &RuleSet) -> Result<Self> {
        let items = catalog.items();
        let mut graph = Self::with_nodes(items.iter().map(|item| item.id.clone()).collect());

        for i in 0..items.len() {
            for j in (i + 1)..items.len() {
                let evaluations = rules.evaluate(&items[i], &items[j])?;
                graph.pairs_evaluated += 1;
                if evaluations.iter().all(|e| e.passed) {
                    graph.add_edge(i, j);
                }
            }
        }

        Ok(graph)
    }

    /// Creates a graph with the given nodes and no edges.
    #[must_use]
    pub fn with_nodes(ids: Vec<ItemId>) -> Self {
        let adjacency = vec![OrdSet::new(); ids.len()];
        Self {
            ids,
            adjacency,
            pairs_evaluated: 0,
        }
    }

    /// Adds an undirected edge between two node positions.
    ///
    /// Self-loops and out-of-range positions are ignored.
    pub fn add_edge(&mut self, a: usize, b: usize) {
        if a == b || a >= self.len() || b >= self.len() {
            return;
        }
        self.adjacency[a].insert(b);
        self.adjacency[b].insert(a);
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the item ids in node order.
    #[must_use]
    pub fn ids(&self) -> &[ItemId] {
        &self.ids
    }

    /// Returns the id at a node position.
    #[must_use]
    pub fn id(&self, node: usize) -> Option<&ItemId> {
        self.ids.get(node)
    }

    /// Returns the neighbours of a node position.
    #[must_use]
    pub fn neighbors(&self, node: usize) -> OrdSet<usize> {
        self.adjacency.get(node).cloned().unwrap_or_default()
    }

    /// Returns the neighbours of an item by id.
    #[must_use]
    pub fn neighbors_of(&self, id: &ItemId) -> Vec<&ItemId> {
        self.position(id)
            .map(|node| self.adjacency[node].iter().map(|&n| &self.ids[n]).collect())
            .unwrap_or_default()
    }

    /// Returns true if the two items are joined by an edge.
    #[must_use]
    pub fn are_compatible(&self, a: &ItemId, b: &ItemId) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(a), Some(b)) => self.adjacency[a].contains(&b),
            _ => false,
        }
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(OrdSet::len).sum::<usize>() / 2
    }

    /// Returns edges over possible edges, or zero for fewer than two nodes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn density(&self) -> f64 {
        let n = self.len();
        if n < 2 {
            return 0.0;
        }
        let possible = n * (n - 1) / 2;
        self.edge_count() as f64 / possible as f64
    }

    /// Returns how many pairs were evaluated to build the graph.
    #[must_use]
    pub fn pairs_evaluated(&self) -> usize {
        self.pairs_evaluated
    }

    /// Returns true if every pair of the given positions is joined.
    #[must_use]
    pub fn is_clique(&self, nodes: &OrdSet<usize>) -> bool {
        nodes.iter().all(|&a| {
            nodes
                .iter()
                .all(|&b| a == b || self.adjacency.get(a).is_some_and(|adj| adj.contains(&b)))
        })
    }

    fn position(&self, id: &ItemId) -> Option<usize> {
        self.ids.iter().position(|candidate| candidate == id)
    }
}
