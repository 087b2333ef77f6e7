//! Loading condition trees and rule sets from any serde format.
//!
//! Deserialization is where the condition grammar is enforced: a node must
//! be a single-key map naming a known operator, with exactly the parameters
//! that operator takes. These helpers turn the format's error into the
//! matching configuration error.

use concord_foundation::{Error, Result};
use serde::{Deserialize, Deserializer};

use crate::cluster_condition::ClusterCondition;
use crate::condition::Condition;
use crate::rule::{ClusterRuleSet, RuleSet};

/// Deserializes a pairwise condition tree.
///
/// # Errors
/// Returns `ConfigError::UnknownOperator` or `ConfigError::MalformedCondition`.
pub fn condition<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Condition> {
    Condition::deserialize(deserializer).map_err(|e| classify(&e.to_string()))
}

/// Deserializes a cluster condition tree.
///
/// # Errors
/// Returns `ConfigError::UnknownOperator` or `ConfigError::MalformedCondition`.
pub fn cluster_condition<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ClusterCondition> {
    ClusterCondition::deserialize(deserializer).map_err(|e| classify(&e.to_string()))
}

/// Deserializes a pairwise rule set.
///
/// # Errors
/// Returns `ConfigError::UnknownOperator` or `ConfigError::MalformedCondition`.
pub fn rule_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RuleSet> {
    RuleSet::deserialize(deserializer).map_err(|e| classify(&e.to_string()))
}

/// Deserializes a cluster rule set.
///
/// # Errors
/// Returns `ConfigError::UnknownOperator` or `ConfigError::MalformedCondition`.
pub fn cluster_rule_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ClusterRuleSet> {
    ClusterRuleSet::deserialize(deserializer).map_err(|e| classify(&e.to_string()))
}

/// Maps a deserialization error message to a configuration error.
///
/// Unknown enum variants name an operator outside the table; everything
/// else is a malformed node.
#[must_use]
pub fn classify(message: &str) -> Error {
    if let Some(rest) = message.strip_prefix("unknown variant `") {
        if let Some(end) = rest.find('`') {
            return Error::unknown_operator(&rest[..end]);
        }
    }
    Error::malformed(message)
}
