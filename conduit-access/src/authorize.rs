//! Request-level and item-level authorization.

use crate::scheme::{access_for_action, AccessDef, AccessScheme, Allow};
use conduit_types::{get_path, Access, AccessStatus, Ident};
use serde_json::Value;
use tracing::debug;

/// What the request-level decision needs to know about a request.
#[derive(Debug, Clone, Copy)]
pub struct RequestAuthorization<'a> {
    pub action_type: &'a str,
    pub ident: Option<&'a Ident>,
    /// Whether the action names a type at all. Meta operations do not.
    pub has_type: bool,
    /// Whether the request goes to a service that authenticates.
    pub requires_auth: bool,
}

/// Decides whether a request may proceed.
///
/// A root ident is always granted, as is an action without a type. Otherwise
/// the scheme resolved from `def` decides; field-dependent rules are granted
/// to any ident here and checked later by [`authorize_items`].
pub fn authorize_request(def: &AccessDef, request: RequestAuthorization<'_>) -> Access {
    let ident = request.ident.cloned();
    if is_root(request.ident) || !request.has_type {
        return Access::granted(ident);
    }

    let scheme = access_for_action(def, request.action_type);
    let status = if authorize_scheme(&scheme, request.ident, request.requires_auth) {
        AccessStatus::Granted
    } else {
        AccessStatus::Refused
    };
    debug!(action = request.action_type, ?status, "authorized request");
    Access::new(status, ident)
}

/// Applies a scheme without looking at any item.
pub fn authorize_scheme(scheme: &AccessScheme, ident: Option<&Ident>, requires_auth: bool) -> bool {
    decide(scheme, ident, requires_auth, None)
}

/// Applies a scheme to one item, including field-dependent rules.
pub fn is_item_authorized(
    item: &Value,
    scheme: &AccessScheme,
    ident: Option<&Ident>,
    requires_auth: bool,
) -> bool {
    decide(scheme, ident, requires_auth, Some(item))
}

fn is_root(ident: Option<&Ident>) -> bool {
    ident.is_some_and(|i| i.root)
}

fn decide(
    scheme: &AccessScheme,
    ident: Option<&Ident>,
    requires_auth: bool,
    item: Option<&Value>,
) -> bool {
    if is_root(ident) {
        return true;
    }
    if scheme.is_empty() {
        return ident.is_some() || !requires_auth;
    }
    match scheme.allow {
        Some(Allow::All) => return true,
        Some(Allow::None) => return false,
        Some(Allow::Auth) | Option::None => {}
    }
    let Some(ident) = ident else {
        return false;
    };

    let has_lists = !scheme.role.is_empty() || !scheme.ident.is_empty();
    if has_lists && is_listed(scheme, ident) {
        return true;
    }
    if scheme.has_field_rules() {
        return match item {
            None => true,
            Some(item) => matches_fields(scheme, ident, item),
        };
    }
    !has_lists
}

fn is_listed(scheme: &AccessScheme, ident: &Ident) -> bool {
    scheme.role.iter().any(|role| ident.has_role(role))
        || ident
            .id
            .as_ref()
            .is_some_and(|id| scheme.ident.contains(id))
}

fn matches_fields(scheme: &AccessScheme, ident: &Ident, item: &Value) -> bool {
    let role_match = scheme.role_from_field.as_deref().is_some_and(|field| {
        field_values(item, field)
            .iter()
            .any(|value| ident.has_role(value))
    });
    let ident_match = scheme.ident_from_field.as_deref().is_some_and(|field| {
        ident
            .id
            .as_ref()
            .is_some_and(|id| field_values(item, field).contains(id))
    });
    role_match || ident_match
}

/// Collects the string values of a field: plain strings, numbers, reference
/// objects (`{id}`), or arrays of any of these.
fn field_values(item: &Value, field: &str) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Number(n) => out.push(n.to_string()),
            Value::Array(values) => values.iter().for_each(|v| collect(v, out)),
            Value::Object(map) => {
                if let Some(id) = map.get("id") {
                    collect(id, out);
                }
            }
            _ => {}
        }
    }

    let mut out = Vec::new();
    if let Some(value) = get_path(item, field) {
        collect(value, &mut out);
    }
    out
}

/// The result of item-level authorization.
///
/// Both fields are `None` when authorization was short-circuited: the
/// request was already refused or there was nothing to authorize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthorizedItems {
    pub data: Option<Vec<Value>>,
    pub access: Option<Access>,
}

/// Filters items by the scheme of each item's type.
///
/// `scheme_for` returns the scheme for an item, or `None` when the item has
/// no known type; such items are refused unless the ident is root.
pub fn authorize_items<F>(
    items: Vec<Value>,
    access: Option<&Access>,
    ident: Option<&Ident>,
    requires_auth: bool,
    scheme_for: F,
) -> AuthorizedItems
where
    F: Fn(&Value) -> Option<AccessScheme>,
{
    if access.is_some_and(Access::is_refused) || items.is_empty() {
        return AuthorizedItems::default();
    }

    let total = items.len();
    let data: Vec<Value> = if is_root(ident) {
        items
    } else {
        items
            .into_iter()
            .filter(|item| {
                scheme_for(item)
                    .is_some_and(|scheme| is_item_authorized(item, &scheme, ident, requires_auth))
            })
            .collect()
    };

    let status = match data.len() {
        n if n == total => AccessStatus::Granted,
        0 => AccessStatus::Refused,
        _ => AccessStatus::Partially,
    };
    debug!(total, authorized = data.len(), ?status, "authorized items");

    AuthorizedItems {
        data: Some(data),
        access: Some(Access::new(status, ident.cloned())),
    }
}
