//! Configuration for cluster search.

use concord_foundation::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which cluster rules may cut branches while the search descends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PruningPolicy {
    /// Only rules whose failure is permanent under growth prune; the rest
    /// are checked when a candidate is emitted.
    #[default]
    HereditaryOnly,
    /// Every failing rule prunes. Faster, but drops clusters when a rule
    /// that fails on a subset would pass on the full set.
    Eager,
}

/// Search parameters for [`find_clusters`](crate::find_clusters).
///
/// Bounds the otherwise exponential search: clusters outside
/// `[min_size, max_size]` are never emitted and the search stops once
/// `max_clusters` have been found.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchConfig {
    /// Smallest cluster emitted (inclusive).
    pub min_size: usize,
    /// Largest cluster emitted (inclusive).
    pub max_size: usize,
    /// Stop after this many clusters.
    pub max_clusters: usize,
    /// Pruning policy for cluster rules.
    pub pruning: PruningPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_size: 2,
            max_size: 10,
            max_clusters: 100,
            pruning: PruningPolicy::HereditaryOnly,
        }
    }
}

impl SearchConfig {
    /// Creates a configuration for small catalogs: every size from one item
    /// up, and effectively no result cap.
    #[must_use]
    pub fn exhaustive() -> Self {
        Self {
            min_size: 1,
            max_size: usize::MAX,
            max_clusters: usize::MAX,
            pruning: PruningPolicy::HereditaryOnly,
        }
    }

    /// Builder method to set the minimum cluster size.
    #[must_use]
    pub fn with_min_size(mut self, size: usize) -> Self {
        self.min_size = size;
        self
    }

    /// Builder method to set the maximum cluster size.
    #[must_use]
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Builder method to set both size bounds.
    #[must_use]
    pub fn with_size_range(self, min: usize, max: usize) -> Self {
        self.with_min_size(min).with_max_size(max)
    }

    /// Builder method to set the result cap.
    #[must_use]
    pub fn with_max_clusters(mut self, count: usize) -> Self {
        self.max_clusters = count;
        self
    }

    /// Builder method to set the pruning policy.
    #[must_use]
    pub fn with_pruning(mut self, pruning: PruningPolicy) -> Self {
        self.pruning = pruning;
        self
    }

    /// Checks the parameters for consistency.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidSearch` if `min_size` is zero, exceeds
    /// `max_size`, or `max_clusters` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.min_size == 0 {
            return Err(Error::invalid_search("min_size must be at least 1"));
        }
        if self.min_size > self.max_size {
            return Err(Error::invalid_search(format!(
                "min_size {} is greater than max_size {}",
                self.min_size, self.max_size
            )));
        }
        if self.max_clusters == 0 {
            return Err(Error::invalid_search("max_clusters must be at least 1"));
        }
        Ok(())
    }
}
