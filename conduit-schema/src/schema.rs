use crate::cast::{Cast, CastOptions};
use crate::error::{SchemaError, SchemaResult};
use crate::shape::{expand_shape, Shape};
use conduit_access::{access_for_action, AccessDef, AccessScheme};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};

/// Declaration of a type, as written in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDef {
    pub id: String,
    #[serde(default)]
    pub plural: Option<String>,
    /// Default service for actions on this type.
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub shape: Value,
    #[serde(default)]
    pub access: AccessDef,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub generate_id: bool,
}

impl SchemaDef {
    pub fn new(id: impl Into<String>, shape: Value) -> Self {
        Self {
            id: id.into(),
            shape,
            ..Self::default()
        }
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    pub fn with_access(mut self, access: impl Into<AccessDef>) -> Self {
        self.access = access.into();
        self
    }

    pub fn with_generate_id(mut self) -> Self {
        self.generate_id = true;
        self
    }

    /// Parses a definition from JSON.
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A compiled schema.
#[derive(Debug, Clone)]
pub struct Schema {
    pub id: String,
    pub plural: String,
    pub service: Option<String>,
    pub shape: Shape,
    pub access: AccessDef,
    pub internal: bool,
    pub generate_id: bool,
    cast: Cast,
}

impl Schema {
    /// Compiles a standalone schema. Related items referenced by its fields
    /// are cast as plain references.
    pub fn new(def: SchemaDef) -> SchemaResult<Self> {
        let shape = expand_shape(&def.shape)?;
        Ok(Self::compile(def, shape, Weak::new()))
    }

    fn compile(def: SchemaDef, shape: Shape, schemas: Weak<Schemas>) -> Self {
        let cast = Cast::new(&shape, def.id.clone(), schemas, def.generate_id);
        Self {
            plural: def.plural.unwrap_or_else(|| format!("{}s", def.id)),
            id: def.id,
            service: def.service,
            shape,
            access: def.access,
            internal: def.internal,
            generate_id: def.generate_id,
            cast,
        }
    }

    /// Casts one item or a list of items of this type.
    pub fn cast(&self, data: &Value, opts: CastOptions) -> Option<Value> {
        self.cast.cast(data, opts)
    }

    pub fn cast_fn(&self) -> &Cast {
        &self.cast
    }

    /// The access scheme that applies to the given action type.
    pub fn access_for_action(&self, action_type: &str) -> AccessScheme {
        access_for_action(&self.access, action_type)
    }
}

/// All schemas of an instance, keyed by id.
#[derive(Debug, Default)]
pub struct Schemas {
    schemas: BTreeMap<String, Schema>,
}

impl Schemas {
    /// Compiles all definitions. Every cast keeps a weak handle to the
    /// registry so embedded related items can be cast by their own schema.
    pub fn new(defs: Vec<SchemaDef>) -> SchemaResult<Arc<Self>> {
        let mut expanded = Vec::with_capacity(defs.len());
        let mut seen = BTreeSet::new();
        for def in defs {
            if !seen.insert(def.id.clone()) {
                return Err(SchemaError::DuplicateSchema(def.id));
            }
            let shape = expand_shape(&def.shape)
                .map_err(|err| match err {
                    SchemaError::InvalidShape(msg) => SchemaError::InvalidShape(format!("{}: {msg}", def.id)),
                    other => other,
                })?;
            expanded.push((def, shape));
        }

        let schemas = Arc::new_cyclic(|registry: &Weak<Schemas>| Schemas {
            schemas: expanded
                .into_iter()
                .map(|(def, shape)| (def.id.clone(), Schema::compile(def, shape, registry.clone())))
                .collect(),
        });
        tracing::debug!(count = schemas.len(), "compiled schemas");
        Ok(schemas)
    }

    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
