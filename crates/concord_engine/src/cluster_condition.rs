//! Set-level condition trees.
//!
//! Same interpreter shape as [`Condition`](crate::Condition), but leaves see
//! the whole candidate set. Every node also reports its [`Monotonicity`] so
//! cluster search knows which rules may cut branches early.

use concord_foundation::{ConfigError, Error, Result, Value};
use concord_schema::Item;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::condition::{FieldParams, Outcome, ValueParams};
use crate::monotonicity::Monotonicity;

/// Parameters carrying a size threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct CountParams {
    /// The threshold.
    pub count: usize,
}

/// Parameters naming a field and a list of values.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ValuesParams {
    /// The dimension inspected.
    pub field: String,
    /// Values that must all be held by some item.
    pub values: Vec<Value>,
}

/// Parameters for `count_distinct`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct BoundsParams {
    /// The dimension inspected.
    pub field: String,
    /// Inclusive lower bound.
    #[cfg_attr(feature = "serde", serde(default))]
    pub min: Option<usize>,
    /// Inclusive upper bound.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max: Option<usize>,
}

/// Parameters for `sum_range`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct RangeParams {
    /// The numeric dimension summed.
    pub field: String,
    /// Inclusive lower bound.
    #[cfg_attr(feature = "serde", serde(default))]
    pub min: Option<f64>,
    /// Inclusive upper bound.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max: Option<f64>,
}

/// A cluster condition node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ClusterCondition {
    /// The set has at least `count` items.
    MinSize(CountParams),
    /// The set has at most `count` items.
    MaxSize(CountParams),
    /// No two items share a value of the field. Absent values are ignored.
    UniqueValues(FieldParams),
    /// Every present value of the field is the same.
    AllEqual(FieldParams),
    /// Some item's value equals (or contains) the given value.
    HasItem(ValueParams),
    /// Every listed value is held by some item.
    CoversAll(ValuesParams),
    /// The number of distinct present values lies within bounds.
    CountDistinct(BoundsParams),
    /// The sum of the field's numeric values lies within bounds.
    SumRange(RangeParams),
    /// Every child holds.
    All(Vec<ClusterCondition>),
    /// Some child holds.
    Any(Vec<ClusterCondition>),
    /// The child does not hold.
    Not(Box<ClusterCondition>),
}

/// Operator names accepted in cluster condition trees.
pub const OPERATORS: &[&str] = &[
    "min_size",
    "max_size",
    "unique_values",
    "all_equal",
    "has_item",
    "covers_all",
    "count_distinct",
    "sum_range",
    "all",
    "any",
    "not",
];

impl ClusterCondition {
    /// Creates a `min_size` leaf.
    #[must_use]
    pub const fn min_size(count: usize) -> Self {
        Self::MinSize(CountParams { count })
    }

    /// Creates a `max_size` leaf.
    #[must_use]
    pub const fn max_size(count: usize) -> Self {
        Self::MaxSize(CountParams { count })
    }

    /// Creates a `unique_values` leaf.
    #[must_use]
    pub fn unique_values(field: impl Into<String>) -> Self {
        Self::UniqueValues(FieldParams {
            field: field.into(),
        })
    }

    /// Creates an `all_equal` leaf.
    #[must_use]
    pub fn all_equal(field: impl Into<String>) -> Self {
        Self::AllEqual(FieldParams {
            field: field.into(),
        })
    }

    /// Creates a `has_item` leaf.
    #[must_use]
    pub fn has_item(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::HasItem(ValueParams {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Creates a `covers_all` leaf.
    #[must_use]
    pub fn covers_all<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::CoversAll(ValuesParams {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Creates a `count_distinct` leaf.
    #[must_use]
    pub fn count_distinct(field: impl Into<String>, min: Option<usize>, max: Option<usize>) -> Self {
        Self::CountDistinct(BoundsParams {
            field: field.into(),
            min,
            max,
        })
    }

    /// Creates a `sum_range` leaf.
    #[must_use]
    pub fn sum_range(field: impl Into<String>, min: Option<f64>, max: Option<f64>) -> Self {
        Self::SumRange(RangeParams {
            field: field.into(),
            min,
            max,
        })
    }

    /// Creates an `all` combinator.
    #[must_use]
    pub fn all(children: Vec<ClusterCondition>) -> Self {
        Self::All(children)
    }

    /// Creates an `any` combinator.
    #[must_use]
    pub fn any(children: Vec<ClusterCondition>) -> Self {
        Self::Any(children)
    }

    /// Creates a `not` combinator.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(child: ClusterCondition) -> Self {
        Self::Not(Box::new(child))
    }

    /// Returns the operator name as spelled in the grammar.
    #[must_use]
    pub const fn operator(&self) -> &'static str {
        match self {
            Self::MinSize(_) => "min_size",
            Self::MaxSize(_) => "max_size",
            Self::UniqueValues(_) => "unique_values",
            Self::AllEqual(_) => "all_equal",
            Self::HasItem(_) => "has_item",
            Self::CoversAll(_) => "covers_all",
            Self::CountDistinct(_) => "count_distinct",
            Self::SumRange(_) => "sum_range",
            Self::All(_) => "all",
            Self::Any(_) => "any",
            Self::Not(_) => "not",
        }
    }

    /// How this condition behaves as the input set grows.
    #[must_use]
    pub fn monotonicity(&self) -> Monotonicity {
        match self {
            Self::MinSize(_) | Self::HasItem(_) | Self::CoversAll(_) => Monotonicity::Upward,
            Self::MaxSize(_) | Self::UniqueValues(_) | Self::AllEqual(_) => {
                Monotonicity::Hereditary
            }
            Self::CountDistinct(p) => match (p.min, p.max) {
                (None, None) => Monotonicity::Constant,
                (None, Some(_)) => Monotonicity::Hereditary,
                (Some(_), None) => Monotonicity::Upward,
                (Some(_), Some(_)) => Monotonicity::Neither,
            },
            Self::SumRange(_) => Monotonicity::Neither,
            Self::All(children) | Self::Any(children) => children
                .iter()
                .map(Self::monotonicity)
                .fold(Monotonicity::Constant, Monotonicity::combine),
            Self::Not(child) => child.monotonicity().negate(),
        }
    }

    /// Collects every field referenced anywhere in the tree.
    pub fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::MinSize(_) | Self::MaxSize(_) => {}
            Self::UniqueValues(p) | Self::AllEqual(p) => out.push(&p.field),
            Self::HasItem(p) => out.push(&p.field),
            Self::CoversAll(p) => out.push(&p.field),
            Self::CountDistinct(p) => out.push(&p.field),
            Self::SumRange(p) => out.push(&p.field),
            Self::All(children) | Self::Any(children) => {
                for child in children {
                    child.collect_fields(out);
                }
            }
            Self::Not(child) => child.collect_fields(out),
        }
    }

    /// Evaluates the condition against a set of items.
    ///
    /// # Errors
    /// Returns a configuration error for inverted bounds or a non-numeric
    /// value under `sum_range`.
    pub fn evaluate(&self, items: &[&Item]) -> Result<Outcome> {
        match self {
            Self::MinSize(CountParams { count }) => {
                let holds = items.len() >= *count;
                let op = if holds { ">=" } else { "<" };
                Ok(Outcome::new(holds, format!("size {} {op} {count}", items.len())))
            }

            Self::MaxSize(CountParams { count }) => {
                let holds = items.len() <= *count;
                let op = if holds { "<=" } else { ">" };
                Ok(Outcome::new(holds, format!("size {} {op} {count}", items.len())))
            }

            Self::UniqueValues(FieldParams { field }) => Ok(unique_values(field, items)),

            Self::AllEqual(FieldParams { field }) => {
                let mut present = items.iter().filter_map(|item| item.get(field));
                let Some(first) = present.next() else {
                    return Ok(Outcome::new(true, format!("{field}: no values")));
                };
                Ok(match present.find(|v| !v.equivalent(first)) {
                    Some(other) => Outcome::new(false, format!("{field}: {first} != {other}")),
                    None => Outcome::new(true, format!("{field}: all {first}")),
                })
            }

            Self::HasItem(ValueParams { field, value }) => {
                let hit = items
                    .iter()
                    .find(|item| item.get(field).is_some_and(|v| v.contains(value)));
                Ok(match hit {
                    Some(item) => Outcome::new(true, format!("{field}: {} has {value}", item.id)),
                    None => Outcome::new(false, format!("{field}: no item has {value}")),
                })
            }

            Self::CoversAll(ValuesParams { field, values }) => {
                let uncovered: Vec<String> = values
                    .iter()
                    .filter(|wanted| {
                        !items
                            .iter()
                            .any(|item| item.get(field).is_some_and(|v| v.contains(wanted)))
                    })
                    .map(ToString::to_string)
                    .collect();
                Ok(if uncovered.is_empty() {
                    Outcome::new(true, format!("{field}: all values covered"))
                } else {
                    Outcome::new(false, format!("{field}: missing {}", uncovered.join(", ")))
                })
            }

            Self::CountDistinct(BoundsParams { field, min, max }) => {
                check_bounds("count_distinct", *min, *max)?;
                let mut distinct: Vec<&Value> = Vec::new();
                for value in items.iter().filter_map(|item| item.get(field)) {
                    for member in value.members() {
                        if !distinct.iter().any(|seen| seen.equivalent(member)) {
                            distinct.push(member);
                        }
                    }
                }
                let n = distinct.len();
                let holds = min.is_none_or(|lo| n >= lo) && max.is_none_or(|hi| n <= hi);
                Ok(Outcome::new(
                    holds,
                    format!("{field}: {n} distinct values {}", bounds_text(holds, *min, *max)),
                ))
            }

            Self::SumRange(RangeParams { field, min, max }) => {
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(Error::malformed(format!(
                            "sum_range min {lo} is greater than max {hi}"
                        ))
                        .in_frame("sum_range"));
                    }
                }
                let mut sum = 0.0;
                for value in items.iter().filter_map(|item| item.get(field)) {
                    for member in value.members() {
                        sum += member.as_number().ok_or_else(|| {
                            Error::from(ConfigError::NonNumericField {
                                operator: "sum_range",
                                field: field.clone(),
                                actual: member.kind_name(),
                            })
                            .in_frame("sum_range")
                        })?;
                    }
                }
                let holds = min.is_none_or(|lo| sum >= lo) && max.is_none_or(|hi| sum <= hi);
                Ok(Outcome::new(
                    holds,
                    format!("{field}: sum {sum} {}", bounds_text(holds, *min, *max)),
                ))
            }

            Self::All(children) => {
                let mut reasons = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let outcome = child
                        .evaluate(items)
                        .map_err(|e| e.in_frame(format!("all[{i}]")))?;
                    if !outcome.holds {
                        return Ok(Outcome::new(
                            false,
                            format!("all: [{i}] failed: {}", outcome.explanation),
                        ));
                    }
                    reasons.push(outcome.explanation);
                }
                Ok(Outcome::new(true, format!("all: {}", reasons.join("; "))))
            }

            Self::Any(children) => {
                let mut reasons = Vec::with_capacity(children.len());
                for (i, child) in children.iter().enumerate() {
                    let outcome = child
                        .evaluate(items)
                        .map_err(|e| e.in_frame(format!("any[{i}]")))?;
                    if outcome.holds {
                        return Ok(Outcome::new(
                            true,
                            format!("any: [{i}] held: {}", outcome.explanation),
                        ));
                    }
                    reasons.push(outcome.explanation);
                }
                Ok(Outcome::new(false, format!("any: none held: {}", reasons.join("; "))))
            }

            Self::Not(child) => {
                let outcome = child.evaluate(items).map_err(|e| e.in_frame("not"))?;
                Ok(Outcome::new(
                    !outcome.holds,
                    format!("not ({})", outcome.explanation),
                ))
            }
        }
    }
}

fn unique_values(field: &str, items: &[&Item]) -> Outcome {
    let present: Vec<(&Item, &Value)> = items
        .iter()
        .filter_map(|item| item.get(field).map(|v| (*item, v)))
        .collect();
    for (i, (a, va)) in present.iter().enumerate() {
        for (b, vb) in &present[i + 1..] {
            if va.shares_member(vb) {
                return Outcome::new(
                    false,
                    format!("{field}: {} and {} share {va}", a.id, b.id),
                );
            }
        }
    }
    Outcome::new(true, format!("{field}: all values unique"))
}

fn check_bounds(operator: &str, min: Option<usize>, max: Option<usize>) -> Result<()> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > hi => Err(Error::malformed(format!(
            "{operator} min {lo} is greater than max {hi}"
        ))
        .in_frame(operator.to_string())),
        _ => Ok(()),
    }
}

fn bounds_text<T: std::fmt::Display>(holds: bool, min: Option<T>, max: Option<T>) -> String {
    let lo = min.map_or_else(|| "-inf".to_string(), |v| v.to_string());
    let hi = max.map_or_else(|| "inf".to_string(), |v| v.to_string());
    let verb = if holds { "within" } else { "outside" };
    format!("{verb} [{lo}, {hi}]")
}
