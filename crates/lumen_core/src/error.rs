//! Core error types

use thiserror::Error;

/// Errors raised at the property-access boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A property was read or written with a value of the wrong type
    #[error("Property `{name}` holds `{found}`, not `{expected}`")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// No property with this name is registered
    #[error("Unknown property: {0}")]
    UnknownProperty(String),
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
