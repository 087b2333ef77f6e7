//! Monotonicity of cluster conditions under set inclusion.
//!
//! Cluster search grows candidate sets one item at a time. A rule may cut a
//! branch only when its verdict on the partial set cannot change as items are
//! added. That depends on how the rule's condition behaves as its input set
//! grows:
//!
//! - **Hereditary**: if it holds for a set, it holds for every subset.
//!   Once false, it stays false for every superset.
//! - **Upward**: if it holds for a set, it holds for every superset.
//!   Once true, it stays true.
//! - **Constant**: independent of the set.
//! - **Neither**: no guarantee in either direction.

use crate::rule::RuleKind;

/// How a condition's truth value behaves as its input set grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Monotonicity {
    /// Independent of the set.
    Constant,
    /// Closed under subsets: false stays false as the set grows.
    Hereditary,
    /// Closed under supersets: true stays true as the set grows.
    Upward,
    /// No guarantee.
    Neither,
}

impl Monotonicity {
    /// Monotonicity of the negated condition.
    #[must_use]
    pub const fn negate(self) -> Self {
        match self {
            Self::Hereditary => Self::Upward,
            Self::Upward => Self::Hereditary,
            other => other,
        }
    }

    /// Monotonicity of a conjunction or disjunction of two conditions.
    ///
    /// Both `and` and `or` preserve each direction, so the rule is the same:
    /// constants are neutral, equal directions are kept, mixed directions
    /// lose all guarantees.
    #[must_use]
    pub const fn combine(self, other: Self) -> Self {
        match (self, other) {
            (Self::Constant, x) | (x, Self::Constant) => x,
            (Self::Hereditary, Self::Hereditary) => Self::Hereditary,
            (Self::Upward, Self::Upward) => Self::Upward,
            _ => Self::Neither,
        }
    }

    /// Returns true if a rule of `kind` with a condition of this
    /// monotonicity can reject a partial set without losing valid supersets.
    ///
    /// A requirement fails when its condition is false, so it needs a
    /// condition that stays false (hereditary). An exclusion fails when its
    /// condition is true, so it needs one that stays true (upward).
    #[must_use]
    pub const fn prunes(self, kind: RuleKind) -> bool {
        match (kind, self) {
            (_, Self::Constant)
            | (RuleKind::Requirement, Self::Hereditary)
            | (RuleKind::Exclusion, Self::Upward) => true,
            _ => false,
        }
    }
}
