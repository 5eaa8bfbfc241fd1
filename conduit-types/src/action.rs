//! Actions: what a caller asks conduit to do.
//!
//! An action is `{type, payload, meta}`. The `type` is a verb such as `GET`
//! or `SET_META`; the payload says what data the verb applies to; the meta
//! carries the ident issuing the action.

use crate::Ident;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A value that may be given either as a single item or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Returns all values as a vector of references.
    pub fn as_vec(&self) -> Vec<&T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values.iter().collect(),
        }
    }

    pub fn is_many(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// Returns the single value, or the first of many.
    pub fn first(&self) -> Option<&T> {
        match self {
            Self::One(value) => Some(value),
            Self::Many(values) => values.first(),
        }
    }
}

impl<T: PartialEq> OneOrMany<T> {
    pub fn contains(&self, value: &T) -> bool {
        match self {
            Self::One(v) => v == value,
            Self::Many(values) => values.contains(value),
        }
    }
}

impl From<&str> for OneOrMany<String> {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for OneOrMany<String> {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<&str>> for OneOrMany<String> {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// What part of a type an action addresses, derived from the payload id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// A single id was requested.
    Member,
    /// An array of ids was requested.
    Members,
    /// No id was requested.
    Collection,
}

/// The data an action applies to.
///
/// Keys that are not one of the well-known fields end up in `params`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Pins the action to the endpoint with this id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Skip mapping and casting, return raw service data (root only).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unmapped: bool,
    /// Cast mapped data without filling in schema defaults.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub only_mapped_values: bool,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Payload {
    /// Returns the scope addressed by this payload's id.
    pub fn scope(&self) -> Scope {
        match &self.id {
            Some(OneOrMany::One(_)) => Scope::Member,
            Some(OneOrMany::Many(_)) => Scope::Members,
            None => Scope::Collection,
        }
    }

    /// Returns the requested types, empty when none was given.
    pub fn types(&self) -> Vec<&str> {
        self.type_
            .as_ref()
            .map(|t| t.as_vec().into_iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Looks up a payload key, well-known fields first, then params.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = match key {
            "type" => self.type_.as_ref().and_then(|t| serde_json::to_value(t).ok()),
            "id" => self.id.as_ref().and_then(|id| serde_json::to_value(id).ok()),
            "data" => self.data.clone(),
            "service" => self.service.clone().map(Value::String),
            "endpoint" => self.endpoint.clone().map(Value::String),
            _ => self.params.get(key).cloned(),
        };
        value.filter(|v| !v.is_null())
    }
}

/// Metadata about an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<Ident>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An action dispatched to conduit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default)]
    pub payload: Payload,
    #[serde(default)]
    pub meta: Meta,
}

impl Action {
    /// Creates an action with an empty payload.
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            type_: action_type.into(),
            payload: Payload::default(),
            meta: Meta::default(),
        }
    }

    /// Parses an action from JSON. The action type must not be empty.
    pub fn from_json(value: Value) -> crate::Result<Self> {
        let action: Self = serde_json::from_value(value)?;
        if action.type_.trim().is_empty() {
            return Err(crate::Error::InvalidAction("missing action type".into()));
        }
        Ok(action)
    }

    pub fn with_type(mut self, item_type: impl Into<OneOrMany<String>>) -> Self {
        self.payload.type_ = Some(item_type.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<OneOrMany<String>>) -> Self {
        self.payload.id = Some(id.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.payload.data = Some(data);
        self
    }

    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.payload.service = Some(service.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.payload.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.params.insert(key.into(), value);
        self
    }

    pub fn with_ident(mut self, ident: Ident) -> Self {
        self.meta.ident = Some(ident);
        self
    }

    /// The part of the action type before the first `_` (`SET_META` → `SET`).
    pub fn type_prefix(&self) -> &str {
        action_prefix(&self.type_)
    }
}

/// The part of an action type before the first `_`.
pub fn action_prefix(action_type: &str) -> &str {
    action_type.split('_').next().unwrap_or(action_type)
}
