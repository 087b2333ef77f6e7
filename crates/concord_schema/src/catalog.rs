//! Catalogs: ordered, uniquely identified item collections bound to a schema.

use std::collections::HashMap;
use std::sync::Arc;

use concord_foundation::{ConfigError, Error, ItemId, Result};

use crate::item::Item;
use crate::schema::Schema;

/// An ordered collection of items described by one schema.
///
/// Item order is preserved; it determines the order of pairwise comparisons
/// and the tie-breaking order of cluster search.
#[derive(Clone, Debug)]
pub struct Catalog {
    name: String,
    schema: Arc<Schema>,
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
}

impl Catalog {
    /// Creates a catalog, rejecting duplicate item identifiers.
    ///
    /// Items are not attribute-validated here; see [`Catalog::validate`].
    ///
    /// # Errors
    /// Returns `ConfigError::DuplicateItem` for the first repeated id.
    pub fn new(name: impl Into<String>, schema: Arc<Schema>, items: Vec<Item>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), position).is_some() {
                return Err(ConfigError::DuplicateItem(item.id.clone()).into());
            }
        }

        Ok(Self {
            name: name.into(),
            schema,
            items,
            index,
        })
    }

    /// Returns the catalog name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the schema the items are described in.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns a shared handle to the schema.
    #[must_use]
    pub fn schema_arc(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    /// Returns the items in catalog order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the catalog has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the position of an item in catalog order.
    #[must_use]
    pub fn position(&self, id: &ItemId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.position(id).map(|i| &self.items[i])
    }

    /// Looks up an item by id, failing if it is absent.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownItem` if no item has this id.
    pub fn require(&self, id: &ItemId) -> Result<&Item> {
        self.item(id)
            .ok_or_else(|| Error::from(ConfigError::UnknownItem(id.clone())))
    }

    /// Validates every item, collecting failures per item.
    ///
    /// Invalid items do not stop validation of the rest.
    #[must_use]
    pub fn validate(&self) -> CatalogValidation {
        let mut report = CatalogValidation::default();
        for item in &self.items {
            match item.validate(&self.schema) {
                Ok(()) => report.valid.push(item.id.clone()),
                Err(err) => report.invalid.push((item.id.clone(), err)),
            }
        }
        report
    }

    /// Validates every item, failing on the first invalid one.
    ///
    /// # Errors
    /// Returns the first item's schema validation error.
    pub fn validate_strict(&self) -> Result<()> {
        self.items
            .iter()
            .try_for_each(|item| item.validate(&self.schema))
    }

    /// Returns a catalog containing only the items that pass validation,
    /// along with the report.
    #[must_use]
    pub fn retain_valid(&self) -> (Self, CatalogValidation) {
        let report = self.validate();
        let items: Vec<Item> = self
            .items
            .iter()
            .filter(|item| report.is_valid(&item.id))
            .cloned()
            .collect();
        let index = items
            .iter()
            .enumerate()
            .map(|(i, item)| (item.id.clone(), i))
            .collect();
        let catalog = Self {
            name: self.name.clone(),
            schema: Arc::clone(&self.schema),
            items,
            index,
        };
        (catalog, report)
    }
}

/// Per-item outcome of validating a catalog.
#[derive(Debug, Default)]
pub struct CatalogValidation {
    /// Items that passed, in catalog order.
    pub valid: Vec<ItemId>,
    /// Items that failed, in catalog order, with their first error.
    pub invalid: Vec<(ItemId, Error)>,
}

impl CatalogValidation {
    /// Returns true if every item passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.invalid.is_empty()
    }

    /// Returns true if the given item passed.
    #[must_use]
    pub fn is_valid(&self, id: &ItemId) -> bool {
        self.valid.contains(id)
    }

    /// Returns the error for an item, if it failed.
    #[must_use]
    pub fn error_for(&self, id: &ItemId) -> Option<&Error> {
        self.invalid
            .iter()
            .find(|(invalid, _)| invalid == id)
            .map(|(_, err)| err)
    }
}
