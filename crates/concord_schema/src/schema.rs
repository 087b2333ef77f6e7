//! Schema definitions for item attributes.
//!
//! A schema is an ordered list of typed dimensions. It is built once, checked
//! for internal consistency at construction, and immutable afterwards.

use std::collections::HashSet;

use concord_foundation::{ConfigError, Error, Result, Type};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::item::Attributes;

/// A named, typed attribute slot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Dimension {
    /// Dimension name, unique within a schema.
    pub name: String,
    /// Declared type (enum value sets and sequence element types live here).
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub ty: Type,
    /// Whether every item must carry this dimension.
    #[cfg_attr(feature = "serde", serde(default))]
    pub required: bool,
    /// Inclusive lower bound for numeric values.
    #[cfg_attr(feature = "serde", serde(default))]
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric values.
    #[cfg_attr(feature = "serde", serde(default))]
    pub max: Option<f64>,
}

impl Dimension {
    /// Creates a required dimension.
    #[must_use]
    pub fn required(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            min: None,
            max: None,
        }
    }

    /// Creates an optional dimension.
    #[must_use]
    pub fn optional(name: impl Into<String>, ty: Type) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Sets inclusive numeric bounds.
    #[must_use]
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    /// Sets the inclusive lower bound.
    #[must_use]
    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Sets the inclusive upper bound.
    #[must_use]
    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Returns true if numeric bounds are declared.
    #[must_use]
    pub const fn is_bounded(&self) -> bool {
        self.min.is_some() || self.max.is_some()
    }

    /// Checks the declaration's own invariants.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidDimension` when an enum has no values,
    /// bounds are inverted, or bounds are declared on a non-numeric type.
    pub fn check(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Error::configuration(ConfigError::InvalidDimension {
                dimension: self.name.clone(),
                reason: reason.to_string(),
            })
        };

        if self.name.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        check_type(&self.ty).map_err(invalid)?;

        if let (Some(min), Some(max)) = (self.min, self.max) {
            if min > max {
                return Err(invalid("min is greater than max"));
            }
        }
        if self.is_bounded() && !bounds_apply(&self.ty) {
            return Err(invalid("bounds require a numeric type"));
        }
        Ok(())
    }
}

fn check_type(ty: &Type) -> std::result::Result<(), &'static str> {
    match ty {
        Type::Enum(values) if values.is_empty() => Err("enumerated value set is empty"),
        Type::Sequence(elem) => check_type(elem),
        _ => Ok(()),
    }
}

fn bounds_apply(ty: &Type) -> bool {
    match ty {
        Type::Integer | Type::Real => true,
        Type::Sequence(elem) => bounds_apply(elem),
        _ => false,
    }
}

/// An ordered set of uniquely named dimensions.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SchemaDef", into = "SchemaDef"))]
pub struct Schema {
    name: String,
    version: String,
    dimensions: Vec<Dimension>,
}

impl Schema {
    /// Creates a schema, checking every dimension and name uniqueness.
    ///
    /// # Errors
    /// Returns a configuration error for duplicate names or invalid
    /// dimension declarations.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dimensions: Vec<Dimension>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for dim in &dimensions {
            dim.check()?;
            if !seen.insert(dim.name.as_str()) {
                return Err(ConfigError::DuplicateDimension(dim.name.clone()).into());
            }
        }

        Ok(Self {
            name: name.into(),
            version: version.into(),
            dimensions,
        })
    }

    /// Returns the schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the dimensions in declaration order.
    #[must_use]
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Returns the dimension by name.
    #[must_use]
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Returns true if the schema declares `name`.
    #[must_use]
    pub fn has_dimension(&self, name: &str) -> bool {
        self.dimension(name).is_some()
    }

    /// Validates an attribute map against this schema.
    ///
    /// # Errors
    /// Returns the first schema validation failure.
    pub fn validate(&self, attributes: &Attributes) -> Result<()> {
        crate::validate::validate_attributes(self, attributes)
    }
}

/// Unchecked wire shape of a [`Schema`].
#[cfg(feature = "serde")]
#[derive(Serialize, Deserialize)]
struct SchemaDef {
    name: String,
    version: String,
    dimensions: Vec<Dimension>,
}

#[cfg(feature = "serde")]
impl TryFrom<SchemaDef> for Schema {
    type Error = Error;

    fn try_from(def: SchemaDef) -> Result<Self> {
        Self::new(def.name, def.version, def.dimensions)
    }
}

#[cfg(feature = "serde")]
impl From<Schema> for SchemaDef {
    fn from(schema: Schema) -> Self {
        Self {
            name: schema.name,
            version: schema.version,
            dimensions: schema.dimensions,
        }
    }
}
