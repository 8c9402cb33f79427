// tests/property/mod.rs

//! Property-based tests for httpmux
//!
//! These tests use property-based testing to verify invariants and properties
//! that should always hold, regardless of input values.
