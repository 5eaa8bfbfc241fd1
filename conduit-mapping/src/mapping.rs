use crate::path::{merge, Path};
use crate::transformer::Transformer;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A transformer resolved at compile time.
#[derive(Clone)]
pub struct NamedTransformer {
    pub name: String,
    transformer: Arc<dyn Transformer>,
}

impl NamedTransformer {
    pub fn new(name: impl Into<String>, transformer: Arc<dyn Transformer>) -> Self {
        Self {
            name: name.into(),
            transformer,
        }
    }
}

impl fmt::Debug for NamedTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedTransformer").field(&self.name).finish()
    }
}

/// A compiled mapping.
///
/// In the forward direction paths are read from the input and object keys
/// are written to the output. Reverse runs swap the two: object keys are
/// read and paths are written, so one definition serves both ways.
#[derive(Debug, Clone)]
pub enum Mapping {
    /// Reads (forward) or writes (reverse) a path.
    Path(Path),
    /// Builds an object; each entry is a target path and the mapping that
    /// produces its value.
    Object(Vec<(Path, Mapping)>),
    /// Runs mappings in sequence. Reverse runs go back to front.
    Pipe(Vec<Mapping>),
    Transform(NamedTransformer),
    /// A fixed value. Only produced forward; reverse runs yield nothing.
    Const(Value),
    /// Replaces an absent or `null` value, in both directions.
    Default(Value),
    /// Runs the inner mapping on every element of an array.
    Iterate(Box<Mapping>),
}

impl Mapping {
    /// The mapping that passes values through unchanged.
    pub fn identity() -> Self {
        Self::Path(Path::root())
    }

    pub fn forward(&self, value: Option<&Value>) -> Option<Value> {
        match self {
            Self::Path(path) => path.get(value?),
            Self::Object(fields) => {
                let input = value?;
                let mut out = Value::Object(Map::new());
                for (target, mapping) in fields {
                    if let Some(value) = mapping.forward(Some(input)) {
                        target.set(&mut out, value);
                    }
                }
                Some(out)
            }
            Self::Pipe(steps) => {
                let mut current = value.cloned();
                for step in steps {
                    current = step.forward(current.as_ref());
                }
                current
            }
            Self::Transform(named) => named.transformer.forward(value),
            Self::Const(fixed) => Some(fixed.clone()),
            Self::Default(default) => or_default(value, default),
            Self::Iterate(inner) => iterate(value?, |item| inner.forward(Some(item))),
        }
    }

    pub fn reverse(&self, value: Option<&Value>) -> Option<Value> {
        match self {
            Self::Path(path) => {
                let value = value?.clone();
                if path.is_root() {
                    return Some(value);
                }
                let mut out = Value::Null;
                path.set(&mut out, value);
                Some(out)
            }
            Self::Object(fields) => {
                let input = value?;
                let mut out = Value::Object(Map::new());
                for (target, mapping) in fields {
                    let field = target.get(input);
                    if let Some(value) = mapping.reverse(field.as_ref()) {
                        merge(&mut out, value);
                    }
                }
                Some(out)
            }
            Self::Pipe(steps) => {
                let mut current = value.cloned();
                for step in steps.iter().rev() {
                    current = step.reverse(current.as_ref());
                }
                current
            }
            Self::Transform(named) => named.transformer.reverse(value),
            Self::Const(_) => None,
            Self::Default(default) => or_default(value, default),
            Self::Iterate(inner) => iterate(value?, |item| inner.reverse(Some(item))),
        }
    }
}

fn or_default(value: Option<&Value>, default: &Value) -> Option<Value> {
    match value {
        None | Some(Value::Null) => Some(default.clone()),
        Some(value) => Some(value.clone()),
    }
}

fn iterate(value: &Value, f: impl Fn(&Value) -> Option<Value>) -> Option<Value> {
    match value {
        Value::Array(items) => Some(Value::Array(items.iter().filter_map(f).collect())),
        other => f(other),
    }
}
