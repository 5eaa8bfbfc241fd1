use crate::{Access, Action, Ident, OneOrMany};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A request on its way to a service adapter.
///
/// Built from an [`Action`] at the start of the send pipeline and shaped by
/// every request stage until the adapter sends it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// The action verb (`GET`, `SET`, ...).
    pub action: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<OneOrMany<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Options of the endpoint selected for this request.
    #[serde(default)]
    pub endpoint: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    /// Transport auth derived from the service authentication, e.g. headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<Ident>,
}

impl Request {
    pub fn from_action(action: &Action) -> Self {
        Self {
            action: action.type_.clone(),
            type_: action.payload.type_.clone(),
            id: action.payload.id.clone(),
            data: action.payload.data.clone(),
            params: action.payload.params.clone(),
            endpoint: Value::Null,
            access: None,
            auth: None,
            ident: action.meta.ident.clone(),
        }
    }
}
