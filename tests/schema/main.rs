//! Integration tests for Layer 1: Schema
//!
//! Tests for schema construction, attribute validation, and catalogs.
