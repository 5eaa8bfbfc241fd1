//! Match filters: a subset of JSON Schema evaluated against a value in the
//! action.
//!
//! Supported keywords are `const`, `enum`, `type`, `pattern`, `minLength`,
//! `maxLength`, `minimum`, `maximum`, `required`, `properties` and `not`,
//! plus the boolean schemas `true` and `false`. Other keywords are ignored.

use crate::error::{EndpointError, EndpointResult};
use conduit_types::get_path;
use regex_lite::Regex;
use serde_json::{Map, Value};

/// A compiled filter on one path of the action.
#[derive(Debug, Clone)]
pub struct Filter {
    path: String,
    schema: Schema,
}

impl Filter {
    pub fn compile(path: &str, schema: &Value) -> EndpointResult<Self> {
        let schema = Schema::compile(schema).map_err(|reason| EndpointError::InvalidFilter {
            path: path.to_string(),
            reason,
        })?;
        Ok(Self {
            path: path.to_string(),
            schema,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Tests the value at the filter path. A missing value is tested as
    /// `null`.
    pub fn is_match(&self, action: &Value) -> bool {
        let value = get_path(action, &self.path).unwrap_or(&Value::Null);
        self.schema.validate(value)
    }
}

#[derive(Debug, Clone)]
enum Schema {
    Bool(bool),
    Rules(Vec<Rule>),
}

#[derive(Debug, Clone)]
enum Rule {
    Const(Value),
    Enum(Vec<Value>),
    Type(Vec<String>),
    Pattern(Regex),
    MinLength(usize),
    MaxLength(usize),
    Minimum(f64),
    Maximum(f64),
    Required(Vec<String>),
    Properties(Vec<(String, Schema)>),
    Not(Box<Schema>),
}

impl Schema {
    fn compile(schema: &Value) -> Result<Self, String> {
        match schema {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Object(obj) => compile_rules(obj).map(Self::Rules),
            other => Err(format!("expected an object or a boolean, got {other}")),
        }
    }

    fn validate(&self, value: &Value) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Rules(rules) => rules.iter().all(|rule| rule.validate(value)),
        }
    }
}

fn compile_rules(obj: &Map<String, Value>) -> Result<Vec<Rule>, String> {
    let mut rules = Vec::new();
    for (keyword, arg) in obj {
        let rule = match keyword.as_str() {
            "const" => Rule::Const(arg.clone()),
            "enum" => match arg {
                Value::Array(values) => Rule::Enum(values.clone()),
                _ => return Err("enum must be an array".into()),
            },
            "type" => match arg {
                Value::String(t) => Rule::Type(vec![t.clone()]),
                Value::Array(types) => Rule::Type(strings(types)),
                _ => return Err("type must be a string or an array".into()),
            },
            "pattern" => {
                let pattern = arg.as_str().ok_or("pattern must be a string")?;
                Rule::Pattern(Regex::new(pattern).map_err(|err| err.to_string())?)
            }
            "minLength" => Rule::MinLength(as_usize(arg, keyword)?),
            "maxLength" => Rule::MaxLength(as_usize(arg, keyword)?),
            "minimum" => Rule::Minimum(arg.as_f64().ok_or("minimum must be a number")?),
            "maximum" => Rule::Maximum(arg.as_f64().ok_or("maximum must be a number")?),
            "required" => match arg {
                Value::Array(keys) => Rule::Required(strings(keys)),
                _ => return Err("required must be an array".into()),
            },
            "properties" => match arg {
                Value::Object(props) => Rule::Properties(
                    props
                        .iter()
                        .map(|(key, schema)| -> Result<(String, Schema), String> {
                            Ok((key.clone(), Schema::compile(schema)?))
                        })
                        .collect::<Result<Vec<_>, String>>()?,
                ),
                _ => return Err("properties must be an object".into()),
            },
            "not" => Rule::Not(Box::new(Schema::compile(arg)?)),
            _ => continue,
        };
        rules.push(rule);
    }
    Ok(rules)
}

fn strings(values: &[Value]) -> Vec<String> {
    values.iter().filter_map(Value::as_str).map(str::to_string).collect()
}

fn as_usize(arg: &Value, keyword: &str) -> Result<usize, String> {
    arg.as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| format!("{keyword} must be a non-negative integer"))
}

impl Rule {
    fn validate(&self, value: &Value) -> bool {
        match self {
            Self::Const(expected) => json_eq(value, expected),
            Self::Enum(values) => values.iter().any(|expected| json_eq(value, expected)),
            Self::Type(types) => types.iter().any(|t| is_type(value, t)),
            Self::Pattern(regex) => value.as_str().is_none_or(|s| regex.is_match(s)),
            Self::MinLength(min) => value.as_str().is_none_or(|s| s.chars().count() >= *min),
            Self::MaxLength(max) => value.as_str().is_none_or(|s| s.chars().count() <= *max),
            Self::Minimum(min) => value.as_f64().is_none_or(|n| n >= *min),
            Self::Maximum(max) => value.as_f64().is_none_or(|n| n <= *max),
            Self::Required(keys) => value
                .as_object()
                .is_none_or(|obj| keys.iter().all(|key| obj.contains_key(key))),
            Self::Properties(props) => value.as_object().is_none_or(|obj| {
                props
                    .iter()
                    .all(|(key, schema)| obj.get(key).is_none_or(|v| schema.validate(v)))
            }),
            Self::Not(schema) => !schema.validate(value),
        }
    }
}

fn is_type(value: &Value, value_type: &str) -> bool {
    match value_type {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.as_f64().is_some_and(|n| n.fract() == 0.0),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => false,
    }
}

/// JSON equality where `1` and `1.0` are the same number.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
