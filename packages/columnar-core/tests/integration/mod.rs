//! Integration test suite.
//!
//! Tests are organized by surface:
//! - Full table lifecycle (schema, load, query, update, clear)
//! - Container export and import

pub mod container_tests;
pub mod helpers;
pub mod lifecycle_tests;
