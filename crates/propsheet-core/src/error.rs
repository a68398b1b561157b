//! Error types for propsheet-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in propsheet-core
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Invalid value type for operation
    #[error("Invalid value type: expected {expected}, got {actual}")]
    InvalidValueType {
        expected: &'static str,
        actual: &'static str,
    },
}
