//! The mapping DSL.
//!
//! Mappings translate between the shape a service speaks and conduit
//! items. Definitions are written as JSON (see [`compile`] for the grammar),
//! compiled once into a [`Mapping`] tree and then run forward (service to
//! conduit) or in reverse.

mod compile;
mod error;
mod mapping;
mod path;
mod transformer;

pub use compile::{MappingDef, Mappings};
pub use error::{MappingError, MappingResult};
pub use mapping::{Mapping, NamedTransformer};
pub use path::{merge, Path};
pub use transformer::{Transformer, Transformers};
