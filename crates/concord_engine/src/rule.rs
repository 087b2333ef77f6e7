//! Rules and rule sets.
//!
//! A rule wraps a condition with a polarity:
//! - an **exclusion** fails when its condition holds
//! - a **requirement** fails when its condition does not hold
//!
//! Pairwise rules ([`Rule`]) carry a [`Condition`]; cluster rules
//! ([`ClusterRule`]) carry a [`ClusterCondition`].

use concord_foundation::{ConfigError, Error, Result};
use concord_schema::{Item, Schema};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cluster_condition::ClusterCondition;
use crate::condition::{Condition, Outcome};
use crate::config::PruningPolicy;

// =============================================================================
// Rule Kind
// =============================================================================

/// Polarity of a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RuleKind {
    /// Fails when the condition holds.
    Exclusion,
    /// Fails when the condition does not hold.
    Requirement,
}

impl RuleKind {
    /// Returns whether a rule of this kind passes given its condition's truth.
    #[must_use]
    pub const fn passed(self, holds: bool) -> bool {
        match self {
            Self::Exclusion => !holds,
            Self::Requirement => holds,
        }
    }

    fn verdict(self, holds: bool) -> &'static str {
        match (self, holds) {
            (Self::Exclusion, true) => "excluded",
            (Self::Exclusion, false) => "not excluded",
            (Self::Requirement, true) => "satisfied",
            (Self::Requirement, false) => "not satisfied",
        }
    }
}

// =============================================================================
// Condition Trees
// =============================================================================

/// Common surface of pairwise and cluster condition trees.
pub trait ConditionTree {
    /// Collects every field referenced anywhere in the tree.
    fn fields<'a>(&'a self, out: &mut Vec<&'a str>);
}

impl ConditionTree for Condition {
    fn fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        self.collect_fields(out);
    }
}

impl ConditionTree for ClusterCondition {
    fn fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        self.collect_fields(out);
    }
}

// =============================================================================
// Rule
// =============================================================================

/// A named condition with a polarity.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct Rule<C = Condition> {
    /// Rule name, used in evaluations and error context.
    pub name: String,
    /// Polarity.
    pub kind: RuleKind,
    /// The condition tree.
    pub condition: C,
    /// Disabled rules are skipped entirely.
    #[cfg_attr(feature = "serde", serde(default = "enabled_by_default"))]
    pub enabled: bool,
    /// Free-form description for rule authors.
    #[cfg_attr(feature = "serde", serde(default))]
    pub description: Option<String>,
}

#[cfg(feature = "serde")]
const fn enabled_by_default() -> bool {
    true
}

/// A rule over a set of items.
pub type ClusterRule = Rule<ClusterCondition>;

impl<C: ConditionTree> Rule<C> {
    /// Creates an enabled rule.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: RuleKind, condition: C) -> Self {
        Self {
            name: name.into(),
            kind,
            condition,
            enabled: true,
            description: None,
        }
    }

    /// Creates an enabled exclusion rule.
    #[must_use]
    pub fn exclusion(name: impl Into<String>, condition: C) -> Self {
        Self::new(name, RuleKind::Exclusion, condition)
    }

    /// Creates an enabled requirement rule.
    #[must_use]
    pub fn requirement(name: impl Into<String>, condition: C) -> Self {
        Self::new(name, RuleKind::Requirement, condition)
    }

    /// Enables or disables the rule.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Checks that every field the condition references is a dimension of
    /// `schema`.
    ///
    /// # Errors
    /// Returns `ConfigError::UndefinedDimension` for the first unknown field.
    pub fn check_fields(&self, schema: &Schema) -> Result<()> {
        let mut fields = Vec::new();
        self.condition.fields(&mut fields);
        match fields.into_iter().find(|f| !schema.has_dimension(f)) {
            Some(field) => Err(Error::from(ConfigError::UndefinedDimension {
                field: field.to_string(),
                schema: schema.name().to_string(),
            })
            .in_source(&self.name)),
            None => Ok(()),
        }
    }

    fn judge(&self, outcome: Result<Outcome>) -> Result<RuleEvaluation> {
        let outcome = outcome.map_err(|e| e.in_source(&self.name))?;
        Ok(RuleEvaluation {
            rule: self.name.clone(),
            kind: self.kind,
            passed: self.kind.passed(outcome.holds),
            explanation: format!(
                "{}: {}",
                self.kind.verdict(outcome.holds),
                outcome.explanation
            ),
        })
    }
}

impl Rule<Condition> {
    /// Evaluates the rule against an item pair.
    ///
    /// # Errors
    /// Returns a configuration error from the condition, tagged with the
    /// rule name.
    pub fn evaluate(&self, a: &Item, b: &Item) -> Result<RuleEvaluation> {
        self.judge(self.condition.evaluate(a, b))
    }
}

impl Rule<ClusterCondition> {
    /// Evaluates the rule against a set of items.
    ///
    /// # Errors
    /// Returns a configuration error from the condition, tagged with the
    /// rule name.
    pub fn evaluate(&self, items: &[&Item]) -> Result<RuleEvaluation> {
        self.judge(self.condition.evaluate(items))
    }

    /// Returns true if a failure of this rule on a partial set rules out
    /// every superset.
    #[must_use]
    pub fn is_prunable(&self) -> bool {
        self.condition.monotonicity().prunes(self.kind)
    }

    /// Returns true if this rule may cut search branches under `policy`.
    #[must_use]
    pub fn gates(&self, policy: PruningPolicy) -> bool {
        match policy {
            PruningPolicy::Eager => true,
            PruningPolicy::HereditaryOnly => self.is_prunable(),
        }
    }
}

/// Outcome of one rule against one pair or set.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleEvaluation {
    /// The rule's name.
    pub rule: String,
    /// The rule's polarity.
    pub kind: RuleKind,
    /// Whether the rule passed.
    pub passed: bool,
    /// Verdict followed by the condition's explanation.
    pub explanation: String,
}

// =============================================================================
// Rule Sets
// =============================================================================

/// An ordered, named collection of pairwise rules for one schema.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RuleSet {
    /// Rule set name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Name of the schema the rules are written against.
    pub schema: String,
    /// Rules in evaluation order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            schema: schema.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Iterates the enabled rules in declared order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// Checks every enabled rule's fields against `schema`.
    ///
    /// # Errors
    /// Returns `ConfigError::UndefinedDimension` for the first unknown field.
    pub fn check_fields(&self, schema: &Schema) -> Result<()> {
        self.enabled_rules()
            .try_for_each(|rule| rule.check_fields(schema))
    }

    /// Evaluates every enabled rule against a pair, in declared order and
    /// without short-circuiting.
    ///
    /// # Errors
    /// Returns the first configuration error raised by a condition.
    pub fn evaluate(&self, a: &Item, b: &Item) -> Result<Vec<RuleEvaluation>> {
        self.enabled_rules().map(|rule| rule.evaluate(a, b)).collect()
    }
}

/// An ordered, named collection of cluster rules.
///
/// The compatibility graph the rules are searched over is defined by the
/// pairwise rule set named in `pairwise_ruleset`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterRuleSet {
    /// Rule set name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Name of the schema the rules are written against.
    pub schema: String,
    /// Name of the pairwise rule set defining compatibility.
    pub pairwise_ruleset: String,
    /// Rules in evaluation order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub rules: Vec<ClusterRule>,
}

impl ClusterRuleSet {
    /// Creates an empty cluster rule set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        schema: impl Into<String>,
        pairwise_ruleset: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            schema: schema.into(),
            pairwise_ruleset: pairwise_ruleset.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: ClusterRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Iterates the enabled rules in declared order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &ClusterRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    /// Iterates enabled rules that cannot safely cut branches during search.
    ///
    /// Under the default pruning policy these are only checked once a
    /// candidate is complete. Authors who want early pruning should rewrite
    /// them as hereditary requirements or upward exclusions.
    pub fn deferred_rules(&self) -> impl Iterator<Item = &ClusterRule> {
        self.enabled_rules().filter(|r| !r.is_prunable())
    }

    /// Checks every enabled rule's fields against `schema`.
    ///
    /// # Errors
    /// Returns `ConfigError::UndefinedDimension` for the first unknown field.
    pub fn check_fields(&self, schema: &Schema) -> Result<()> {
        self.enabled_rules()
            .try_for_each(|rule| rule.check_fields(schema))
    }

    /// Evaluates every enabled rule against a set, in declared order and
    /// without short-circuiting.
    ///
    /// # Errors
    /// Returns the first configuration error raised by a condition.
    pub fn evaluate(&self, items: &[&Item]) -> Result<Vec<RuleEvaluation>> {
        self.enabled_rules().map(|rule| rule.evaluate(items)).collect()
    }
}
