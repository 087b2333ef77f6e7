//! Dimensions, schemas, items, catalogs, and attribute validation for Concord.
//!
//! This crate provides:
//! - [`Schema`] - The typed dimension space items are described in
//! - [`Item`] - An identified, named bundle of attribute values
//! - [`Catalog`] - An ordered collection of items bound to a schema
//! - [`validate_attributes`] - First-failure attribute validation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod item;
pub mod schema;
pub mod validate;

pub use catalog::{Catalog, CatalogValidation};
pub use item::{Attributes, Item};
pub use schema::{Dimension, Schema};
pub use validate::validate_attributes;
