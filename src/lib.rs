//! Concord - Rule-driven compatibility evaluation and cluster discovery
//!
//! This crate re-exports all layers of the Concord system for convenient access.
//! For detailed documentation, see the individual layer crates.
//!
//! # Architecture
//!
//! ```text
//! Layer 2: concord_engine      Conditions, rules, pairwise matrix, cluster search
//! Layer 1: concord_schema      Dimensions, schemas, items, catalogs, validation
//! Layer 0: concord_foundation  Core types (Value, Type, ItemId, Error)
//! ```

pub use concord_engine as engine;
pub use concord_foundation as foundation;
pub use concord_schema as schema;
