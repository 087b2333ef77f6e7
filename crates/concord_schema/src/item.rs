//! Items: identified, named bundles of attribute values.

use std::collections::BTreeMap;

use concord_foundation::{ItemId, Result, Value};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Attribute mapping from dimension name to value.
///
/// Ordered so that iteration, and anything derived from it, is deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// A catalog entry.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Item {
    /// Stable identifier, unique within a catalog.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Attribute values keyed by dimension name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: Attributes,
}

impl Item {
    /// Creates an item with no attributes.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Sets an attribute value.
    #[must_use]
    pub fn with(mut self, dimension: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(dimension.into(), value.into());
        self
    }

    /// Returns the value of a dimension, if present.
    #[must_use]
    pub fn get(&self, dimension: &str) -> Option<&Value> {
        self.attributes.get(dimension)
    }

    /// Returns true if the item carries a value for `dimension`.
    #[must_use]
    pub fn has(&self, dimension: &str) -> bool {
        self.attributes.contains_key(dimension)
    }

    /// Validates this item's attributes against a schema.
    ///
    /// # Errors
    /// Returns the first schema validation failure, tagged with this item's id.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        schema
            .validate(&self.attributes)
            .map_err(|e| e.for_item(self.id.clone()))
    }
}
