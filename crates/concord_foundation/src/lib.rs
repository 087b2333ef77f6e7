//! Core values, dimension types, identifiers, and errors for Concord.
//!
//! This crate provides:
//! - [`Value`] - The attribute value type carried by items
//! - [`Type`] - Dimension type descriptors for schema validation
//! - [`ItemId`] - Stable item identifiers
//! - [`Error`] - Rich error types with context

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod types;
pub mod value;

pub use error::{ConfigError, Error, ErrorContext, ErrorKind, Result, ValidationReason};
pub use id::ItemId;
pub use types::Type;
pub use value::Value;
