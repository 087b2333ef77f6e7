//! Integration tests across all layers
//!
//! Tests the full pipeline from JSON documents to validated catalogs, the
//! compatibility matrix, and cluster search, plus search properties over
//! generated catalogs.

mod properties;
