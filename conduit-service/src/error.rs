//! Error types for setting up services and loading definitions.
//!
//! Only setup can fail with an `Err`. Once an [`Instance`](crate::Instance)
//! is built, every failure is reported as a response status.

use conduit_endpoint::EndpointError;
use conduit_mapping::MappingError;
use conduit_schema::SchemaError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for building services and instances.
pub type SetupResult<T> = Result<T, SetupError>;

/// Errors raised while building an instance from definitions.
#[derive(Debug, Error)]
pub enum SetupError {
    /// A schema definition is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A mapping definition is invalid.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// An endpoint definition is invalid.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A service refers to an adapter that was not registered.
    #[error("unknown adapter '{adapter}' on service '{service}'")]
    UnknownAdapter { service: String, adapter: String },

    /// An auth definition refers to an authenticator that was not registered.
    #[error("unknown authenticator '{authenticator}' on auth '{auth}'")]
    UnknownAuthenticator { auth: String, authenticator: String },

    /// A service refers to an auth that was not defined.
    #[error("unknown auth '{auth}' on service '{service}'")]
    UnknownAuth { service: String, auth: String },

    /// A service maps a type that has no schema.
    #[error("unknown type '{type_name}' in mappings of service '{service}'")]
    UnknownType { service: String, type_name: String },

    /// A service refers to a named mapping that was not defined.
    #[error("unknown mapping '{mapping}' for type '{type_name}' on service '{service}'")]
    UnknownMapping {
        service: String,
        type_name: String,
        mapping: String,
    },

    /// Two services were given the same id.
    #[error("duplicate service id: {0}")]
    DuplicateService(String),

    /// Two auths were given the same id.
    #[error("duplicate auth id: {0}")]
    DuplicateAuth(String),
}

/// Result type for loading definitions.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading definitions from text or files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The definitions file could not be read.
    #[error("failed to read definitions: {0}")]
    Io(#[from] std::io::Error),

    /// JSON definitions could not be parsed.
    #[error("invalid JSON definitions: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML definitions could not be parsed.
    #[error("invalid TOML definitions: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file extension is neither `.json` nor `.toml`.
    #[error("unsupported definitions format: {0}")]
    UnsupportedFormat(PathBuf),
}
