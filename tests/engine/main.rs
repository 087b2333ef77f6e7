//! Integration tests for Layer 2: Engine
//!
//! Tests for condition operators, pairwise evaluation, cluster search, and
//! the serialized condition grammar.

mod clusters;
mod pairwise;
