//! In-memory columnar table engine for session-scoped tables.
//!
//! Provides typed column buffers with chunked growth, a value codec,
//! search/filter/sort/paginate queries over row indices, point updates
//! keyed by id, container export/import, and per-session metrics.

pub mod column;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod metrics;
pub mod query;
pub mod schema;
pub mod store;
pub mod value;

pub use engine::TableEngine;
pub use error::{EngineError, Result};
