// tests/integration/mod.rs

//! Integration tests for httpmux
//!
//! These tests drive the multiplexer end-to-end through a scripted transport,
//! checking slot lifecycle, event routing and JSON document behavior.

pub mod json_document_test;
pub mod multiplexer_test;
pub mod reqwest_transport_test;
