//! Attribute validation against a schema.
//!
//! Validation stops at the first failing dimension. Checks run in this order:
//!
//! 1. every required dimension is present (schema order)
//! 2. for each present value, in schema order: runtime type, numeric range,
//!    enum membership, then sequence elements
//! 3. no attribute names an undeclared dimension

use concord_foundation::{Error, Result, Type, ValidationReason, Value};

use crate::item::Attributes;
use crate::schema::{Dimension, Schema};

/// Validates an attribute map against a schema.
///
/// Pure: no side effects, no partial results.
///
/// # Errors
/// Returns a schema validation error naming the first failing dimension.
pub fn validate_attributes(schema: &Schema, attributes: &Attributes) -> Result<()> {
    if let Some(missing) = schema
        .dimensions()
        .iter()
        .find(|d| d.required && !attributes.contains_key(&d.name))
    {
        return Err(Error::validation(&missing.name, ValidationReason::Missing));
    }

    for dim in schema.dimensions() {
        if let Some(value) = attributes.get(&dim.name) {
            check_value(dim, &dim.ty, value)
                .map_err(|reason| Error::validation(&dim.name, reason))?;
        }
    }

    if let Some(name) = attributes.keys().find(|k| !schema.has_dimension(k)) {
        return Err(Error::validation(name, ValidationReason::Undeclared));
    }

    Ok(())
}

fn check_value(
    dim: &Dimension,
    ty: &Type,
    value: &Value,
) -> std::result::Result<(), ValidationReason> {
    if !ty.accepts_kind(value) {
        return Err(ValidationReason::TypeMismatch {
            expected: ty.clone(),
            actual: value.kind_name(),
        });
    }

    match (ty, value) {
        (Type::Integer | Type::Real, _) => check_range(dim, value),
        (Type::Enum(allowed), Value::Text(text)) => {
            if allowed.iter().any(|a| a.as_str() == &**text) {
                Ok(())
            } else {
                Err(ValidationReason::NotInValueSet {
                    value: text.to_string(),
                    allowed: allowed.clone(),
                })
            }
        }
        (Type::Sequence(elem), Value::Seq(items)) => {
            for (index, item) in items.iter().enumerate() {
                check_value(dim, elem, item).map_err(|reason| ValidationReason::Element {
                    index,
                    reason: Box::new(reason),
                })?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_range(dim: &Dimension, value: &Value) -> std::result::Result<(), ValidationReason> {
    let Some(n) = value.as_number() else {
        return Ok(());
    };
    let below = dim.min.is_some_and(|min| n < min);
    let above = dim.max.is_some_and(|max| n > max);
    if below || above || (n.is_nan() && dim.is_bounded()) {
        return Err(ValidationReason::OutOfRange {
            value: n,
            min: dim.min,
            max: dim.max,
        });
    }
    Ok(())
}
