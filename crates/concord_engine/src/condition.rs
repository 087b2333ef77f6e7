//! Pairwise condition trees.
//!
//! A condition is a closed sum type over the operator table. Each node
//! evaluates against two items and yields an [`Outcome`]: a boolean plus a
//! human-readable explanation. The serialized grammar is one single-key map
//! per node, naming the operator:
//!
//! ```text
//! all:
//!   - equals: { field: body_zone }
//!   - not:
//!       has_different: { field: layer }
//! ```
//!
//! # Missing fields
//!
//! Every leaf decides what absence means, and the policy is part of the
//! operator's contract:
//!
//! | operator | field absent on one or both items |
//! |---|---|
//! | `equals`, `not_equals`, `within`, `overlaps` | false |
//! | `has_different` | true if absent on exactly one side, false if on both |
//! | `any_equals` | the item without the field does not match |
//! | `any_missing` | true (absence is what it tests) |
//! | `conflicting_layers` | false: no conflict can be shown |

use concord_foundation::{ConfigError, Error, Result, Value};
use concord_schema::Item;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Version of the operator tables. Bumped whenever an operator is added,
/// removed, or changes meaning.
pub const OPERATOR_VERSION: u32 = 1;

/// Result of evaluating a condition node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Whether the condition holds.
    pub holds: bool,
    /// Why.
    pub explanation: String,
}

impl Outcome {
    /// Creates an outcome.
    #[must_use]
    pub fn new(holds: bool, explanation: impl Into<String>) -> Self {
        Self {
            holds,
            explanation: explanation.into(),
        }
    }
}

/// Parameters naming a single field.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct FieldParams {
    /// The dimension compared.
    pub field: String,
}

/// Parameters for `within`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct WithinParams {
    /// The numeric dimension compared.
    pub field: String,
    /// Largest allowed absolute difference (inclusive).
    pub threshold: f64,
}

/// Parameters naming a field and a value to look for.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ValueParams {
    /// The dimension inspected.
    pub field: String,
    /// The value looked for (sequence values match if they contain it).
    pub value: Value,
}

/// Parameters for `conflicting_layers`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct LayerParams {
    /// The zone dimension (scalar or sequence).
    pub field: String,
    /// The layer dimension.
    pub layer: String,
}

/// A pairwise condition node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Condition {
    /// Both items carry the field with equivalent values.
    Equals(FieldParams),
    /// Both items carry the field with different values.
    NotEquals(FieldParams),
    /// The items disagree on the field; presence on one side only counts.
    HasDifferent(FieldParams),
    /// Both numeric values lie within `threshold` of each other.
    Within(WithinParams),
    /// At least one item's value equals (or contains) the given value.
    AnyEquals(ValueParams),
    /// At least one item lacks the field.
    AnyMissing(FieldParams),
    /// The two values share at least one member.
    Overlaps(FieldParams),
    /// The items cover a common zone on the same layer.
    ConflictingLayers(LayerParams),
    /// Every child holds.
    All(Vec<Condition>),
    /// Some child holds.
    Any(Vec<Condition>),
    /// The child does not hold.
    Not(Box<Condition>),
}

/// Operator names accepted in pairwise condition trees.
pub const OPERATORS: &[&str] = &[
    "equals",
    "not_equals",
    "has_different",
    "within",
    "any_equals",
    "any_missing",
    "overlaps",
    "conflicting_layers",
    "all",
    "any",
    "not",
];

impl Condition {
    /// Creates an `equals` leaf.
    #[must_use]
    pub fn equals(field: impl Into<String>) -> Self {
        Self::Equals(FieldParams {
            field: field.into(),
        })
    }

    /// Creates a `not_equals` leaf.
    #[must_use]
    pub fn not_equals(field: impl Into<String>) -> Self {
        Self::NotEquals(FieldParams {
            field: field.into(),
        })
    }

    /// Creates a `has_different` leaf.
    #[must_use]
    pub fn has_different(field: impl Into<String>) -> Self {
        Self::HasDifferent(FieldParams {
            field: field.into(),
        })
    }

    /// Creates a `within` leaf.
    #[must_use]
    pub fn within(field: impl Into<String>, threshold: f64) -> Self {
        Self::Within(WithinParams {
            field: field.into(),
            threshold,
        })
    }

    /// Creates an `any_equals` leaf.
    #[must_use]
    pub fn any_equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::AnyEquals(ValueParams {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Creates an `any_missing` leaf.
    #[must_use]
    pub fn any_missing(field: impl Into<String>) -> Self {
        Self::AnyMissing(FieldParams {
            field: field.into(),
        })
    }

    /// Creates an `overlaps` leaf.
    #[must_use]
    pub fn overlaps(field: impl Into<String>) -> Self {
        Self::Overlaps(FieldParams {
            field: field.into(),
        })
    }

    /// Creates a `conflicting_layers` leaf.
    #[must_use]
    pub fn conflicting_layers(field: impl Into<String>, layer: impl Into<String>) -> Self {
        Self::ConflictingLayers(LayerParams {
            field: field.into(),
            layer: layer.into(),
        })
    }

    /// Creates an `all` combinator.
    #[must_use]
    pub fn all(children: Vec<Condition>) -> Self {
        Self::All(children)
    }

    /// Creates an `any` combinator.
    #[must_use]
    pub fn any(children: Vec<Condition>) -> Self {
        Self::Any(children)
    }

    /// Creates a `not` combinator.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: Condition) -> Self {
        Self::Not(Box::new(child))
    }

    /// Returns the operator name as spelled in the grammar.
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::Equals(_) => "equals",
            Self::NotEquals(_) => "not_equals",
            Self::HasDifferent(_) => "has_different",
            Self::Within(_) => "within",
            Self::AnyEquals(_) => "any_equals",
            Self::AnyMissing(_) => "any_missing",
            Self::Overlaps(_) => "overlaps",
            Self::ConflictingLayers(_) => "conflicting_layers",
            Self::All(_) => "all",
            Self::Any(_) => "any",
            Self::Not(_) => "not",
        }
    }

    /// Collects every field referenced anywhere in the tree.
    pub fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Equals(p)
            | Self::NotEquals(p)
            | Self::HasDifferent(p)
            | Self::AnyMissing(p)
            | Self::Overlaps(p) => out.push(&p.field),
            Self::Within(p) => out.push(&p.field),
            Self::AnyEquals(p) => out.push(&p.field),
            Self::ConflictingLayers(p) => {
                out.push(&p.field);
                out.push(&p.layer);
            }
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Self::Not(child) => child.collect_fields(out),
        }
    }

    /// Evaluates the condition against an item pair.
    ///
    /// # Errors
    /// Returns a configuration error if a numeric operator meets a
    /// non-numeric value or its parameters are invalid. The error's context
    /// stack names the failing node.
    pub fn evaluate(&self, a: &Item, b: &Item) -> Result<Outcome> {
        match self {
            Self::Equals(FieldParams { field }) => Ok(match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => {
                    let holds = x.equivalent(y);
                    let op = if holds { "==" } else { "!=" };
                    Outcome::new(holds, format!("{field}: {x} {op} {y}"))
                }
                _ => Outcome::new(false, missing(field, a, b)),
            }),

            Self::NotEquals(FieldParams { field }) => Ok(match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => {
                    let holds = !x.equivalent(y);
                    let op = if holds { "!=" } else { "==" };
                    Outcome::new(holds, format!("{field}: {x} {op} {y}"))
                }
                _ => Outcome::new(false, missing(field, a, b)),
            }),

            Self::HasDifferent(FieldParams { field }) => Ok(match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => {
                    let holds = !x.equivalent(y);
                    let op = if holds { "!=" } else { "==" };
                    Outcome::new(holds, format!("{field}: {x} {op} {y}"))
                }
                (Some(_), None) => {
                    Outcome::new(true, format!("{field}: present only on {}", a.id))
                }
                (None, Some(_)) => {
                    Outcome::new(true, format!("{field}: present only on {}", b.id))
                }
                (None, None) => Outcome::new(false, missing(field, a, b)),
            }),

            Self::Within(WithinParams { field, threshold }) => within(field, *threshold, a, b),

            Self::AnyEquals(ValueParams { field, value }) => {
                let hit = [a, b]
                    .into_iter()
                    .find(|item| item.get(field).is_some_and(|v| v.contains(value)));
                Ok(match hit {
                    Some(item) => Outcome::new(true, format!("{field}: {} has {value}", item.id)),
                    None => Outcome::new(
                        false,
                        format!("{field}: neither {} nor {} has {value}", a.id, b.id),
                    ),
                })
            }

            Self::AnyMissing(FieldParams { field }) => Ok(if a.has(field) && b.has(field) {
                Outcome::new(false, format!("{field}: present on both"))
            } else {
                Outcome::new(true, missing(field, a, b))
            }),

            Self::Overlaps(FieldParams { field }) => Ok(match (a.get(field), b.get(field)) {
                (Some(x), Some(y)) => {
                    let holds = x.shares_member(y);
                    let verb = if holds { "overlaps" } else { "is disjoint from" };
                    Outcome::new(holds, format!("{field}: {x} {verb} {y}"))
                }
                _ => Outcome::new(false, missing(field, a, b)),
            }),

            Self::ConflictingLayers(LayerParams { field, layer }) => {
                Ok(conflicting_layers(field, layer, a, b))
            }

            Self::All(children) => {
                let mut reasons = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let outcome = child
                        .evaluate(a, b)
                        .map_err(|e| e.in_frame(format!("all[{i}]")))?;
                    if !outcome.holds {
                        return Ok(Outcome::new(
                            false,
                            format!("all: [{i}] failed: {}", outcome.explanation),
                        ));
                    }
                    reasons.push(outcome.explanation);
                }
                Ok(Outcome::new(true, format!("all: {}", joined(&reasons))))
            }

            Self::Any(children) => {
                let mut reasons = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let outcome = child
                        .evaluate(a, b)
                        .map_err(|e| e.in_frame(format!("any[{i}]")))?;
                    if outcome.holds {
                        return Ok(Outcome::new(
                            true,
                            format!("any: [{i}] held: {}", outcome.explanation),
                        ));
                    }
                    reasons.push(outcome.explanation);
                }
                Ok(Outcome::new(false, format!("any: none held: {}", joined(&reasons))))
            }

            Self::Not(child) => {
                let outcome = child.evaluate(a, b).map_err(|e| e.in_frame("not"))?;
                Ok(Outcome::new(
                    !outcome.holds,
                    format!("not ({})", outcome.explanation),
                ))
            }
        }
    }
}

fn joined(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "(no conditions)".to_string()
    } else {
        reasons.join("; ")
    }
}

fn missing(field: &str, a: &Item, b: &Item) -> String {
    match (a.has(field), b.has(field)) {
        (false, false) => format!("{field}: missing on {} and {}", a.id, b.id),
        (false, true) => format!("{field}: missing on {}", a.id),
        (true, false) => format!("{field}: missing on {}", b.id),
        (true, true) => format!("{field}: present on both"),
    }
}

fn numeric(operator: &'static str, field: &str, value: &Value) -> Result<f64> {
    value.as_number().ok_or_else(|| {
        Error::from(ConfigError::NonNumericField {
            operator,
            field: field.to_string(),
            actual: value.kind_name(),
        })
    })
}

fn within(field: &str, threshold: f64, a: &Item, b: &Item) -> Result<Outcome> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(
            Error::malformed(format!("within threshold must be non-negative, got {threshold}"))
                .in_frame("within"),
        );
    }
    let (Some(x), Some(y)) = (a.get(field), b.get(field)) else {
        return Ok(Outcome::new(false, missing(field, a, b)));
    };
    let x = numeric("within", field, x).map_err(|e| e.in_frame("within"))?;
    let y = numeric("within", field, y).map_err(|e| e.in_frame("within"))?;
    let diff = (x - y).abs();
    let holds = diff <= threshold;
    let op = if holds { "<=" } else { ">" };
    Ok(Outcome::new(
        holds,
        format!("{field}: |{x} - {y}| = {diff} {op} {threshold}"),
    ))
}

fn conflicting_layers(zone: &str, layer: &str, a: &Item, b: &Item) -> Outcome {
    let (Some(za), Some(zb)) = (a.get(zone), b.get(zone)) else {
        return Outcome::new(false, format!("no conflict: {}", missing(zone, a, b)));
    };
    let (Some(la), Some(lb)) = (a.get(layer), b.get(layer)) else {
        return Outcome::new(false, format!("no conflict: {}", missing(layer, a, b)));
    };
    if !za.shares_member(zb) {
        return Outcome::new(false, format!("no conflict: {zone} {za} and {zb} are disjoint"));
    }
    if la.equivalent(lb) {
        Outcome::new(true, format!("conflict: {zone} overlap with {layer} {la} on both"))
    } else {
        Outcome::new(false, format!("no conflict: {layer} {la} != {lb}"))
    }
}
