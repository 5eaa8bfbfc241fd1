use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named value transformation, referenced from mappings with
/// `{"$transform": "<name>"}`.
///
/// Only [`forward`](Transformer::forward) is required. Reverse mapping uses
/// the same transformation unless [`reverse`](Transformer::reverse) is
/// overridden.
pub trait Transformer: Send + Sync {
    /// Transforms a value coming from a service. `None` is an absent value.
    fn forward(&self, value: Option<&Value>) -> Option<Value>;

    /// Transforms a value going to a service.
    fn reverse(&self, value: Option<&Value>) -> Option<Value> {
        self.forward(value)
    }
}

impl<F> Transformer for F
where
    F: Fn(Option<&Value>) -> Option<Value> + Send + Sync,
{
    fn forward(&self, value: Option<&Value>) -> Option<Value> {
        self(value)
    }
}

/// Registry of transformers by name.
#[derive(Clone, Default)]
pub struct Transformers {
    transformers: HashMap<String, Arc<dyn Transformer>>,
}

impl Transformers {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in transformers: `string`, `number`,
    /// `boolean`, `trim`, `lowercase`, `uppercase` and `not`.
    pub fn with_builtins() -> Self {
        let mut transformers = Self::new();
        transformers.register("string", to_string);
        transformers.register("number", to_number);
        transformers.register("boolean", to_boolean);
        transformers.register("trim", |v: Option<&Value>| map_str(v, |s| s.trim().to_string()));
        transformers.register("lowercase", |v: Option<&Value>| map_str(v, str::to_lowercase));
        transformers.register("uppercase", |v: Option<&Value>| map_str(v, str::to_uppercase));
        transformers.register("not", |v: Option<&Value>| {
            to_boolean(v).and_then(|b| b.as_bool()).map(|b| Value::Bool(!b))
        });
        transformers
    }

    pub fn register(&mut self, name: impl Into<String>, transformer: impl Transformer + 'static) {
        self.transformers.insert(name.into(), Arc::new(transformer));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }
}

impl fmt::Debug for Transformers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transformers.keys().collect();
        names.sort();
        f.debug_struct("Transformers").field("names", &names).finish()
    }
}

fn to_string(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn to_number(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::Number(n) => Some(Value::Number(n.clone())),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Value::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(Value::Number))
        }
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

fn to_boolean(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::Number(n) => n.as_f64().map(|f| Value::Bool(f != 0.0)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" | "" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Null => Some(Value::Bool(false)),
        _ => None,
    }
}

fn map_str(value: Option<&Value>, f: impl Fn(&str) -> String) -> Option<Value> {
    match value? {
        Value::String(s) => Some(Value::String(f(s))),
        other => Some(other.clone()),
    }
}
