//! Error types for schema setup.

use thiserror::Error;

/// Result type for schema setup.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while building schemas. Casting itself never errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// One or more fields in a shape violate the required types.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// The schema definition could not be parsed.
    #[error("invalid schema definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),

    /// Two schemas were given the same id.
    #[error("duplicate schema id: {0}")]
    DuplicateSchema(String),
}
