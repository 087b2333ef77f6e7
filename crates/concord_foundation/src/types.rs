//! Type descriptors for schema validation.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Type descriptor for a schema dimension.
///
/// Used to declare dimension types and validate item attribute values.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Type {
    /// Free-form text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Real,
    /// Boolean.
    Boolean,
    /// Text restricted to a fixed, non-empty value set.
    Enum(Vec<String>),
    /// Ordered sequence whose elements all have the given type.
    Sequence(Box<Type>),
}

impl Type {
    /// Creates an enumerated type with the given allowed values.
    #[must_use]
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Creates a sequence type with the given element type.
    #[must_use]
    pub fn sequence(element: Type) -> Self {
        Self::Sequence(Box::new(element))
    }

    /// Returns true if values of this type are numeric.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Real)
    }

    /// Returns the element type of a sequence type.
    #[must_use]
    pub fn element(&self) -> Option<&Type> {
        match self {
            Self::Sequence(elem) => Some(elem),
            _ => None,
        }
    }

    /// Returns the allowed values of an enumerated type.
    #[must_use]
    pub fn allowed_values(&self) -> Option<&[String]> {
        match self {
            Self::Enum(values) => Some(values),
            _ => None,
        }
    }

    /// Checks whether a value's runtime kind matches this type.
    ///
    /// This is a shallow check: enum membership, numeric bounds, and
    /// sequence element types are validated separately by the schema.
    /// `Real` accepts integers (numeric promotion); `Integer` does not
    /// accept reals.
    #[must_use]
    pub fn accepts_kind(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::Text | Self::Enum(_), Value::Text(_))
                | (Self::Integer | Self::Real, Value::Int(_))
                | (Self::Real, Value::Float(_))
                | (Self::Boolean, Value::Bool(_))
                | (Self::Sequence(_), Value::Seq(_))
        )
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Integer => write!(f, "integer"),
            Self::Real => write!(f, "real"),
            Self::Boolean => write!(f, "boolean"),
            Self::Enum(values) => write!(f, "enum{{{}}}", values.join(", ")),
            Self::Sequence(t) => write!(f, "sequence<{t:?}>"),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
