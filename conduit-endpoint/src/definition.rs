use conduit_types::{OneOrMany, Scope};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// The match object of an endpoint: which actions it serves.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchObject {
    #[serde(rename = "type", default)]
    pub type_: Option<OneOrMany<String>>,
    #[serde(default)]
    pub scope: Option<OneOrMany<Scope>>,
    #[serde(default)]
    pub action: Option<OneOrMany<String>>,
    /// Payload params, `true` when required.
    #[serde(default)]
    pub params: BTreeMap<String, bool>,
    /// JSON schemas keyed by a dotted path into the action.
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
}

impl MatchObject {
    pub fn required_params(&self) -> usize {
        self.params.values().filter(|required| **required).count()
    }

    pub fn optional_params(&self) -> usize {
        self.params.values().filter(|required| !**required).count()
    }
}

/// An endpoint as written in a service definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDef {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "match", default)]
    pub match_: MatchObject,
    /// Merged over the service options.
    #[serde(default)]
    pub options: Value,
    /// Mapping between the internal request/response envelopes and the
    /// service's.
    #[serde(default)]
    pub mutation: Option<Value>,
    /// Extra adapters run before the service adapter when serializing and
    /// after it when normalizing.
    #[serde(default)]
    pub adapters: Vec<String>,
}

impl EndpointDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, item_type: impl Into<OneOrMany<String>>) -> Self {
        self.match_.type_ = Some(item_type.into());
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.match_.scope = Some(OneOrMany::One(scope));
        self
    }

    pub fn with_scopes(mut self, scopes: Vec<Scope>) -> Self {
        self.match_.scope = Some(OneOrMany::Many(scopes));
        self
    }

    pub fn with_action(mut self, action: impl Into<OneOrMany<String>>) -> Self {
        self.match_.action = Some(action.into());
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, required: bool) -> Self {
        self.match_.params.insert(key.into(), required);
        self
    }

    pub fn with_filter(mut self, path: impl Into<String>, schema: Value) -> Self {
        self.match_.filters.insert(path.into(), schema);
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn with_mutation(mut self, mutation: Value) -> Self {
        self.mutation = Some(mutation);
        self
    }

    pub fn with_adapter(mut self, adapter: impl Into<String>) -> Self {
        self.adapters.push(adapter.into());
        self
    }
}
