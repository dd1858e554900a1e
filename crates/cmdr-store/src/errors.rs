//! Error handling for cmdr-store
//!
//! Wraps cmdr-core CmdError with store-specific helpers

use cmdr_core::errors::{CmdError, CmdErrorKind, CommandError};

/// Result type alias using CmdError
pub type Result<T> = std::result::Result<T, CmdError>;

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> CmdError {
    CmdError::new(CmdErrorKind::Persistence)
        .with_op("migration")
        .with_message(format!("Migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error for an already-applied migration
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> CmdError {
    CmdError::new(CmdErrorKind::Persistence)
        .with_op("migration_checksum")
        .with_message(format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a cache error
pub fn cache_error(operation: &str, reason: impl Into<String>) -> CmdError {
    CmdError::new(CmdErrorKind::Cache)
        .with_op(operation.to_string())
        .with_message(reason)
}

/// Create a log-not-found error
pub fn log_not_found(log_id: i64) -> CmdError {
    CommandError::LogNotFound { log_id }.into()
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> CmdError {
    CmdError::new(CmdErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> CmdError {
    CmdError::new(CmdErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}
