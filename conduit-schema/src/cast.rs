//! The cast engine: a shape compiled into a bidirectional cast function.
//!
//! Forward casting turns raw data into typed items (`$type` tag, string id,
//! coerced fields, references as `{id, $ref}`). Reverse casting prepares
//! typed items for a service: no `$type`, references flattened to `{id}`,
//! constant fields left out.

use crate::primitives::{now_iso, Primitive};
use crate::schema::Schemas;
use crate::shape::{FieldDefinition, Shape, ShapeNode};
use conduit_types::{ensure_array, generate_id};
use serde_json::{Map, Value};
use std::sync::Weak;

/// Options for one cast call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CastOptions {
    /// Cast towards the service instead of from it.
    pub is_rev: bool,
    /// Do not fill in defaults, dates or generated ids.
    pub no_defaults: bool,
}

impl CastOptions {
    pub fn forward() -> Self {
        Self::default()
    }

    pub fn reverse() -> Self {
        Self {
            is_rev: true,
            no_defaults: false,
        }
    }

    pub fn without_defaults() -> Self {
        Self {
            is_rev: false,
            no_defaults: true,
        }
    }

    fn applies_defaults(&self) -> bool {
        !self.is_rev && !self.no_defaults
    }
}

#[derive(Debug, Clone)]
enum Caster {
    Const(Value),
    Primitive {
        kind: Primitive,
        is_array: bool,
        default: Option<Value>,
    },
    Reference {
        type_name: String,
        is_array: bool,
        default: Option<Value>,
    },
    Nested(Vec<(String, Caster)>),
}

struct Context<'a> {
    opts: CastOptions,
    schemas: Option<&'a Schemas>,
}

impl Context<'_> {
    fn default_for(&self, default: &Option<Value>) -> Option<Value> {
        if self.opts.applies_defaults() {
            default.clone()
        } else {
            None
        }
    }
}

/// A compiled cast for one type.
#[derive(Debug, Clone)]
pub struct Cast {
    type_name: String,
    fields: Vec<(String, Caster)>,
    generate_id: bool,
    has_dates: bool,
    schemas: Weak<Schemas>,
}

impl Cast {
    /// Compiles a shape. `schemas` is used to cast embedded related items;
    /// pass `Weak::new()` when there is no registry.
    pub fn new(shape: &Shape, type_name: impl Into<String>, schemas: Weak<Schemas>, generate_id: bool) -> Self {
        let fields = compile_fields(shape)
            .into_iter()
            .filter(|(key, _)| key != "id")
            .collect();
        Self {
            type_name: type_name.into(),
            fields,
            generate_id,
            has_dates: shape.contains("createdAt") || shape.contains("updatedAt"),
            schemas,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Casts one item or an array of items.
    ///
    /// `null` entries and non-objects in arrays are dropped; a single
    /// non-object gives `None`.
    pub fn cast(&self, data: &Value, opts: CastOptions) -> Option<Value> {
        match data {
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .map(|obj| Value::Object(self.cast_item(obj, opts)))
                    .collect(),
            )),
            Value::Object(obj) => Some(Value::Object(self.cast_item(obj, opts))),
            _ => None,
        }
    }

    /// Casts a single item object.
    pub fn cast_item(&self, obj: &Map<String, Value>, opts: CastOptions) -> Map<String, Value> {
        let schemas = self.schemas.upgrade();
        let ctx = Context {
            opts,
            schemas: schemas.as_deref(),
        };

        if !opts.is_rev && obj.get("$type").and_then(Value::as_str) == Some(self.type_name.as_str()) {
            let mut out = obj.clone();
            if opts.applies_defaults() {
                for (key, caster) in &self.fields {
                    if !out.contains_key(key) {
                        if let Some(default) = caster.default_value() {
                            out.insert(key.clone(), default);
                        }
                    }
                }
                self.complete_dates(&mut out);
            }
            return out;
        }

        let mut out = cast_fields(&self.fields, obj, &ctx);
        out.insert("id".to_string(), self.cast_id(obj.get("id"), opts));
        if !opts.is_rev {
            out.insert("$type".to_string(), Value::String(self.type_name.clone()));
        }
        if opts.applies_defaults() {
            self.complete_dates(&mut out);
        }
        for flag in ["isNew", "isDeleted"] {
            if obj.get(flag) == Some(&Value::Bool(true)) {
                out.insert(flag.to_string(), Value::Bool(true));
            }
        }
        out
    }

    fn cast_id(&self, id: Option<&Value>, opts: CastOptions) -> Value {
        match id.and_then(id_string) {
            Some(id) => Value::String(id),
            None if self.generate_id && opts.applies_defaults() => Value::String(generate_id()),
            None => Value::Null,
        }
    }

    fn complete_dates(&self, out: &mut Map<String, Value>) {
        if !self.has_dates {
            return;
        }
        let present = |out: &Map<String, Value>, key: &str| out.get(key).filter(|v| !v.is_null()).cloned();
        if !out.contains_key("createdAt") {
            let created = present(out, "updatedAt").unwrap_or_else(|| Value::String(now_iso()));
            out.insert("createdAt".to_string(), created);
        }
        if !out.contains_key("updatedAt") {
            let created = present(out, "createdAt").unwrap_or_else(|| Value::String(now_iso()));
            out.insert("updatedAt".to_string(), created);
        }
    }
}

fn compile_fields(shape: &Shape) -> Vec<(String, Caster)> {
    shape
        .iter()
        .filter_map(|(key, node)| {
            let (key, force_array) = match key.strip_suffix("[]") {
                Some(stripped) => (stripped.to_string(), true),
                None => (key.clone(), false),
            };
            let caster = match node {
                ShapeNode::Field(def) => compile_field(def, force_array)?,
                ShapeNode::Nested(nested) => Caster::Nested(compile_fields(nested)),
            };
            Some((key, caster))
        })
        .collect()
}

fn compile_field(def: &FieldDefinition, force_array: bool) -> Option<Caster> {
    if let Some(value) = &def.const_value {
        return Some(Caster::Const(value.clone()));
    }
    let value_type = def.value_type.as_deref()?;
    let (base, is_array) = match value_type.strip_suffix("[]") {
        Some(base) => (base, true),
        None => (value_type, force_array),
    };
    let default = def.default.clone();
    Some(match Primitive::parse(base) {
        Some(kind) => Caster::Primitive {
            kind,
            is_array,
            default,
        },
        None => Caster::Reference {
            type_name: base.to_string(),
            is_array,
            default,
        },
    })
}

fn cast_fields(fields: &[(String, Caster)], obj: &Map<String, Value>, ctx: &Context<'_>) -> Map<String, Value> {
    fields
        .iter()
        .filter_map(|(key, caster)| caster.cast(obj.get(key), ctx).map(|value| (key.clone(), value)))
        .collect()
}

impl Caster {
    fn default_value(&self) -> Option<Value> {
        match self {
            Self::Const(value) => Some(value.clone()),
            Self::Primitive { default, .. } | Self::Reference { default, .. } => default.clone(),
            Self::Nested(_) => None,
        }
    }

    fn cast(&self, value: Option<&Value>, ctx: &Context<'_>) -> Option<Value> {
        match self {
            Self::Const(value) => (!ctx.opts.is_rev).then(|| value.clone()),
            Self::Primitive {
                kind: Primitive::Unknown,
                is_array: false,
                default,
            } => value.cloned().or_else(|| ctx.default_for(default)),
            Self::Primitive {
                kind,
                is_array,
                default,
            } => cast_values(value, *is_array, |v| kind.cast(v)).or_else(|| ctx.default_for(default)),
            Self::Reference {
                type_name,
                is_array,
                default,
            } => cast_values(value, *is_array, |v| cast_reference(v, type_name, ctx))
                .or_else(|| ctx.default_for(default)),
            Self::Nested(fields) => match value? {
                Value::Object(obj) => Some(Value::Object(cast_fields(fields, obj, ctx))),
                Value::Null => Some(Value::Null),
                _ => None,
            },
        }
    }
}

/// Applies `cast` to a field value, honoring array expectations: an array
/// field casts every element, a scalar field unwraps a single-element array
/// and rejects longer ones.
fn cast_values<F>(value: Option<&Value>, is_array: bool, cast: F) -> Option<Value>
where
    F: Fn(&Value) -> Option<Value>,
{
    let value = value?;
    if value.is_null() {
        return Some(Value::Null);
    }
    if is_array {
        return Some(Value::Array(
            ensure_array(value.clone()).iter().filter_map(&cast).collect(),
        ));
    }
    match value {
        Value::Array(items) => match items.as_slice() {
            [single] => cast(single),
            _ => None,
        },
        _ => cast(value),
    }
}

fn cast_reference(value: &Value, type_name: &str, ctx: &Context<'_>) -> Option<Value> {
    match value {
        Value::String(_) | Value::Number(_) => Some(reference(id_string(value)?, type_name, ctx.opts)),
        Value::Object(obj) => {
            if is_embedded(obj) {
                if let Some(schema) = ctx.schemas.and_then(|schemas| schemas.get(type_name)) {
                    return Some(Value::Object(schema.cast_fn().cast_item(obj, ctx.opts)));
                }
            }
            let id = obj.get("id").and_then(id_string)?;
            Some(reference(id, type_name, ctx.opts))
        }
        _ => None,
    }
}

fn reference(id: String, type_name: &str, opts: CastOptions) -> Value {
    let mut obj = Map::new();
    obj.insert("id".to_string(), Value::String(id));
    if !opts.is_rev {
        obj.insert("$ref".to_string(), Value::String(type_name.to_string()));
    }
    Value::Object(obj)
}

/// An object carrying more than reference keys is a full related item.
fn is_embedded(obj: &Map<String, Value>) -> bool {
    obj.keys()
        .any(|key| !matches!(key.as_str(), "id" | "$ref" | "$type" | "isNew" | "isDeleted"))
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
