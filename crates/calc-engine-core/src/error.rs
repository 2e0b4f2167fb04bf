//! Error types for calc-engine-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while converting runtime values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Value cannot be represented as the requested type
    #[error("Invalid value type: expected {expected}, got {actual}")]
    InvalidValueType {
        expected: &'static str,
        actual: &'static str,
    },

    /// Text that was expected to hold a number
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}
