use thiserror::Error;

pub type MappingResult<T> = Result<T, MappingError>;

/// Errors raised while compiling mapping definitions.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("unknown transformer: {0}")]
    UnknownTransformer(String),

    #[error("unknown mapping: {0}")]
    UnknownMapping(String),

    /// A named mapping applies itself, directly or through others.
    #[error("mapping '{0}' applies itself")]
    Cycle(String),

    #[error("duplicate mapping id: {0}")]
    DuplicateMapping(String),

    #[error("invalid mapping definition: {0}")]
    InvalidDefinition(String),
}
