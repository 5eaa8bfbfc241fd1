//! Access definitions and their normalization into schemes.

use conduit_types::{action_prefix, OneOrMany};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Who an access scheme lets through, before role and ident rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Allow {
    /// Everyone, authenticated or not.
    All,
    /// Any authenticated ident.
    Auth,
    /// Nobody.
    None,
}

impl Allow {
    /// Parses an allow keyword. Anything unrecognized denies.
    pub fn parse(value: &str) -> Self {
        match value {
            "all" => Self::All,
            "auth" => Self::Auth,
            _ => Self::None,
        }
    }
}

impl<'de> Deserialize<'de> for Allow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or(Self::None, Self::parse))
    }
}

/// An access definition as written in a schema.
///
/// An absent definition and an explicit `null` mean different things: the
/// first declares no restriction, the second denies everyone.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AccessDef {
    /// No `access` key at all.
    #[default]
    Undeclared,
    /// `access: null`.
    Deny,
    /// `access: "auth"` and friends.
    Shorthand(String),
    Scheme(SchemeDef),
}

impl AccessDef {
    /// Builds a definition from raw JSON.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Deny,
            Value::String(allow) => Self::Shorthand(allow),
            Value::Object(_) => serde_json::from_value(value).map_or(Self::Deny, Self::Scheme),
            _ => Self::Deny,
        }
    }
}

impl From<&str> for AccessDef {
    fn from(allow: &str) -> Self {
        Self::Shorthand(allow.to_string())
    }
}

impl<'de> Deserialize<'de> for AccessDef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_value(Value::deserialize(deserializer)?))
    }
}

/// The object form of an access definition.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemeDef {
    #[serde(default)]
    pub allow: Option<Allow>,
    #[serde(default)]
    pub role: Option<OneOrMany<String>>,
    #[serde(default)]
    pub ident: Option<OneOrMany<String>>,
    #[serde(default)]
    pub role_from_field: Option<String>,
    #[serde(default)]
    pub ident_from_field: Option<String>,
    /// Overrides keyed by action type prefix (`GET`, `SET`, ...).
    #[serde(default)]
    pub actions: BTreeMap<String, AccessDef>,
}

/// A normalized access scheme, resolved for one action.
///
/// The default value is the empty scheme: nothing was declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessScheme {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow: Option<Allow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub role: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ident: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_from_field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ident_from_field: Option<String>,
}

impl AccessScheme {
    /// The scheme that refuses everyone.
    pub fn deny() -> Self {
        Self {
            allow: Some(Allow::None),
            ..Default::default()
        }
    }

    pub fn allow(allow: Allow) -> Self {
        Self {
            allow: Some(allow),
            ..Default::default()
        }
    }

    /// True when the scheme declares nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when part of the decision depends on item fields.
    pub fn has_field_rules(&self) -> bool {
        self.role_from_field.is_some() || self.ident_from_field.is_some()
    }
}

/// Resolves the access scheme that applies to an action type.
///
/// - no definition gives the empty scheme
/// - `null` gives `{allow: none}`
/// - an object is normalized; an `actions` entry keyed by the action type
///   prefix replaces the whole scheme
pub fn access_for_action(def: &AccessDef, action_type: &str) -> AccessScheme {
    match def {
        AccessDef::Scheme(scheme) => match scheme.actions.get(action_prefix(action_type)) {
            Some(over) => normalize(over),
            None => normalize(def),
        },
        _ => normalize(def),
    }
}

fn normalize(def: &AccessDef) -> AccessScheme {
    match def {
        AccessDef::Undeclared => AccessScheme::default(),
        AccessDef::Deny => AccessScheme::deny(),
        AccessDef::Shorthand(allow) => AccessScheme::allow(Allow::parse(allow)),
        AccessDef::Scheme(scheme) => AccessScheme {
            allow: scheme.allow,
            role: to_vec(scheme.role.as_ref()),
            ident: to_vec(scheme.ident.as_ref()),
            role_from_field: scheme.role_from_field.clone(),
            ident_from_field: scheme.ident_from_field.clone(),
        },
    }
}

fn to_vec(values: Option<&OneOrMany<String>>) -> Vec<String> {
    values
        .map(|v| v.as_vec().into_iter().cloned().collect())
        .unwrap_or_default()
}
