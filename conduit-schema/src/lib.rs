//! Schemas and the cast engine.
//!
//! Defines how conduit types are declared and how raw values become typed
//! data:
//! - [`Shape`]: the tree of field definitions of a type, expanded from the
//!   JSON shorthand by [`expand_shape`]
//! - [`Cast`]: a shape compiled into a bidirectional cast function
//! - [`Schema`]: id, shape, access rules and the compiled cast of one type
//! - [`Schemas`]: the registry of all schemas, used to cast embedded items
//!
//! Casting never fails: invalid fields are dropped, invalid items are
//! skipped. Only shape validation at setup time returns errors.

mod cast;
mod error;
mod primitives;
mod schema;
mod shape;

pub use cast::{Cast, CastOptions};
pub use error::{SchemaError, SchemaResult};
pub use primitives::{now_iso, Primitive};
pub use schema::{Schema, SchemaDef, Schemas};
pub use shape::{expand_shape, FieldDefinition, Shape, ShapeNode};
