//! Engine error types.

use thiserror::Error;

use crate::schema::ColumnKind;

/// Engine operation errors.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Session not found
    #[error("Session '{session}' not found")]
    SessionNotFound { session: String },

    /// Value cannot be coerced to the column's kind
    #[error("Cannot decode {raw} as {kind} for column '{column}'")]
    DecodeError {
        column: String,
        kind: ColumnKind,
        raw: String,
    },

    /// Schema validation failed
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Lock poisoned (RwLock or Mutex poisoned)
    #[error("Lock poisoned")]
    LockPoisoned,

    /// Data corruption detected
    #[error("Data corruption detected: {0}")]
    DataCorruption(String),

    /// Disk full error during export
    #[error("Disk full: {0}")]
    DiskFull(String),

    /// I/O error during export or import
    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
