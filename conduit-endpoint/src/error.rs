//! Error types for endpoints and adapters.

use conduit_mapping::MappingError;
use thiserror::Error;

/// Result type for endpoint setup.
pub type EndpointResult<T> = Result<T, EndpointError>;

/// Errors raised while building endpoints.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// An extra adapter id has no registered adapter.
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    /// The endpoint mutation could not be compiled.
    #[error("invalid mutation: {0}")]
    Mapping(#[from] MappingError),

    /// A match filter is not a usable schema.
    #[error("invalid filter on '{path}': {reason}")]
    InvalidFilter { path: String, reason: String },
}

/// A failure inside an adapter or while shaping data for one.
///
/// The send pipeline turns these into `error` responses carrying the
/// message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AdapterError(pub String);

impl AdapterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}
