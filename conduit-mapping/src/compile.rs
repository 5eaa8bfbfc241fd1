//! Compiling mapping definitions.
//!
//! Grammar of a definition:
//! - `"a.b[]"`: a path
//! - `[def, ...]`: a pipe
//! - `{"$value": v}`: a constant
//! - `{"$default": v}`: a default for absent values
//! - `{"$transform": "name"}`: a registered transformer
//! - `{"$apply": "id"}`: the named mapping `id`, inlined
//! - `{"$iterate": def}`: `def` run on every element
//! - any other object: an object mapping from target paths to definitions;
//!   `"$iterate": true` among its keys iterates the whole object mapping

use crate::error::{MappingError, MappingResult};
use crate::mapping::{Mapping, NamedTransformer};
use crate::path::Path;
use crate::transformer::Transformers;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A named mapping definition.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingDef {
    pub id: String,
    pub mapping: Value,
}

impl MappingDef {
    pub fn new(id: impl Into<String>, mapping: Value) -> Self {
        Self {
            id: id.into(),
            mapping,
        }
    }
}

/// Compiled named mappings, plus what is needed to compile more
/// definitions that refer to them.
#[derive(Debug, Clone, Default)]
pub struct Mappings {
    defs: BTreeMap<String, Value>,
    compiled: BTreeMap<String, Mapping>,
    transformers: Transformers,
}

impl Mappings {
    /// Compiles every definition. `$apply` references are resolved here.
    pub fn new(defs: Vec<MappingDef>, transformers: Transformers) -> MappingResult<Self> {
        let mut by_id = BTreeMap::new();
        for def in defs {
            if by_id.contains_key(&def.id) {
                return Err(MappingError::DuplicateMapping(def.id));
            }
            by_id.insert(def.id, def.mapping);
        }

        let mut mappings = Self {
            defs: by_id,
            compiled: BTreeMap::new(),
            transformers,
        };
        let mut compiled = BTreeMap::new();
        for id in mappings.defs.keys() {
            compiled.insert(id.clone(), mappings.compile_named(id)?);
        }
        tracing::debug!(count = compiled.len(), "compiled mappings");
        mappings.compiled = compiled;
        Ok(mappings)
    }

    pub fn get(&self, id: &str) -> Option<&Mapping> {
        self.compiled.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.compiled.contains_key(id)
    }

    pub fn transformers(&self) -> &Transformers {
        &self.transformers
    }

    /// Compiles an anonymous definition against these named mappings.
    pub fn compile(&self, def: &Value) -> MappingResult<Mapping> {
        Compiler::new(self).compile(def)
    }

    fn compile_named(&self, id: &str) -> MappingResult<Mapping> {
        let mut compiler = Compiler::new(self);
        compiler.apply(id)
    }
}

struct Compiler<'a> {
    mappings: &'a Mappings,
    applying: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn new(mappings: &'a Mappings) -> Self {
        Self {
            mappings,
            applying: Vec::new(),
        }
    }

    fn compile(&mut self, def: &Value) -> MappingResult<Mapping> {
        match def {
            Value::String(path) => Ok(Mapping::Path(Path::parse(path)?)),
            Value::Array(steps) => {
                let steps = steps
                    .iter()
                    .map(|step| self.compile(step))
                    .collect::<MappingResult<Vec<_>>>()?;
                Ok(Mapping::Pipe(steps))
            }
            Value::Object(obj) => self.compile_object(obj),
            Value::Null => Ok(Mapping::identity()),
            other => Err(MappingError::InvalidDefinition(format!(
                "expected a path, a pipe or an object, got {other}"
            ))),
        }
    }

    fn compile_object(&mut self, obj: &Map<String, Value>) -> MappingResult<Mapping> {
        if let Some(value) = obj.get("$value") {
            return Ok(Mapping::Const(value.clone()));
        }
        if let Some(value) = obj.get("$default") {
            return Ok(Mapping::Default(value.clone()));
        }
        if let Some(name) = obj.get("$transform") {
            let name = name
                .as_str()
                .ok_or_else(|| MappingError::InvalidDefinition("$transform must name a transformer".into()))?;
            let transformer = self
                .mappings
                .transformers
                .get(name)
                .ok_or_else(|| MappingError::UnknownTransformer(name.to_string()))?;
            return Ok(Mapping::Transform(NamedTransformer::new(name, transformer)));
        }
        if let Some(id) = obj.get("$apply") {
            let id = id
                .as_str()
                .ok_or_else(|| MappingError::InvalidDefinition("$apply must name a mapping".into()))?;
            return self.apply(id);
        }
        match obj.get("$iterate") {
            Some(Value::Bool(true)) => {
                let fields = self.compile_fields(obj)?;
                return Ok(Mapping::Iterate(Box::new(fields)));
            }
            Some(Value::Bool(false)) | None => {}
            Some(inner) => return Ok(Mapping::Iterate(Box::new(self.compile(inner)?))),
        }
        self.compile_fields(obj)
    }

    fn compile_fields(&mut self, obj: &Map<String, Value>) -> MappingResult<Mapping> {
        let fields = obj
            .iter()
            .filter(|(key, _)| !key.starts_with('$'))
            .map(|(key, def)| -> MappingResult<(Path, Mapping)> {
                Ok((Path::parse(key)?, self.compile(def)?))
            })
            .collect::<MappingResult<Vec<_>>>()?;
        Ok(Mapping::Object(fields))
    }

    fn apply(&mut self, id: &str) -> MappingResult<Mapping> {
        if self.applying.iter().any(|applying| applying == id) {
            return Err(MappingError::Cycle(id.to_string()));
        }
        if let Some(compiled) = self.mappings.compiled.get(id) {
            return Ok(compiled.clone());
        }
        let mappings = self.mappings;
        let def = mappings
            .defs
            .get(id)
            .ok_or_else(|| MappingError::UnknownMapping(id.to_string()))?;
        self.applying.push(id.to_string());
        let mapping = self.compile(def);
        self.applying.pop();
        mapping
    }
}
