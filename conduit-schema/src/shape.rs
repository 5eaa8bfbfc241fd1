//! Shape definitions and their expansion from the JSON shorthand.
//!
//! A shape is written as an object whose values are either a type name
//! (`"title": "string"`), a field definition (`{"$type": "integer",
//! "default": 0}`), or a nested shape.

use crate::error::{SchemaError, SchemaResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single field of a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// The `$type` of the field. `None` when `$type` was not a string; such
    /// fields are skipped when casting.
    pub value_type: Option<String>,
    pub default: Option<Value>,
    pub const_value: Option<Value>,
}

impl FieldDefinition {
    /// Creates a field of the given type with no default.
    pub fn of_type(value_type: impl Into<String>) -> Self {
        Self {
            value_type: Some(value_type.into()),
            default: None,
            const_value: None,
        }
    }

    fn from_object(def: &Map<String, Value>) -> Self {
        Self {
            value_type: def.get("$type").and_then(Value::as_str).map(str::to_string),
            default: def.get("default").cloned(),
            const_value: def.get("const").cloned(),
        }
    }

    /// True when the field's type is exactly `value_type`.
    pub fn is_type(&self, value_type: &str) -> bool {
        self.value_type.as_deref() == Some(value_type)
    }
}

/// A node in a shape tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeNode {
    Field(FieldDefinition),
    Nested(Shape),
}

/// An expanded shape: field name to definition or nested shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: BTreeMap<String, ShapeNode>,
}

impl Shape {
    pub fn get(&self, key: &str) -> Option<&ShapeNode> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ShapeNode)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Expands a shape definition and validates its reserved fields.
///
/// `id` must be a string and `createdAt`/`updatedAt` must be dates. All
/// violations are reported together. A missing `id` is added as a string
/// field.
pub fn expand_shape(def: &Value) -> SchemaResult<Shape> {
    let mut shape = expand(def);

    let violations: Vec<String> = [("id", "string"), ("createdAt", "date"), ("updatedAt", "date")]
        .into_iter()
        .filter(|(key, value_type)| match shape.get(key) {
            None => false,
            Some(ShapeNode::Field(field)) => !field.is_type(value_type),
            Some(ShapeNode::Nested(_)) => true,
        })
        .map(|(key, value_type)| format!("'{key}' must be of type '{value_type}'."))
        .collect();
    if !violations.is_empty() {
        return Err(SchemaError::InvalidShape(violations.join(" ")));
    }

    shape
        .fields
        .entry("id".to_string())
        .or_insert_with(|| ShapeNode::Field(FieldDefinition::of_type("string")));
    Ok(shape)
}

fn expand(def: &Value) -> Shape {
    let Some(map) = def.as_object() else {
        return Shape::default();
    };
    let fields = map
        .iter()
        .filter_map(|(key, value)| {
            let node = match value {
                Value::String(value_type) => ShapeNode::Field(FieldDefinition::of_type(value_type)),
                Value::Object(obj) if obj.contains_key("$type") => {
                    ShapeNode::Field(FieldDefinition::from_object(obj))
                }
                Value::Object(_) => ShapeNode::Nested(expand(value)),
                _ => return None,
            };
            Some((key.clone(), node))
        })
        .collect();
    Shape { fields }
}
