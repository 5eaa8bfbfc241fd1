//! Core type definitions for conduit.
//!
//! This crate defines the plumbing types every other conduit crate speaks:
//! - [`Action`]: what a caller asks for (verb, payload, meta)
//! - [`Request`] / [`Response`]: the exchange with a service
//! - [`Ident`] and [`Access`]: who is asking and what they were allowed
//! - [`Status`]: the response status vocabulary
//!
//! Items travelling through conduit are plain JSON objects
//! (`serde_json::Value`) tagged with a `$type` key once they have been cast.

mod action;
mod ident;
mod ids;
mod request;
mod response;

pub use action::{action_prefix, Action, Meta, OneOrMany, Payload, Scope};
pub use ident::{Access, AccessStatus, Ident};
pub use ids::generate_id;
pub use request::Request;
pub use response::{Response, Status};

use serde_json::Value;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid action: {0}")]
    InvalidAction(String),
}

/// Returns the `$type` tag of a cast item.
pub fn item_type(item: &Value) -> Option<&str> {
    item.get("$type").and_then(Value::as_str)
}

/// Returns the id of an item, stringifying numeric ids.
pub fn item_id(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Wraps a value in an array unless it already is one. `null` becomes an
/// empty array.
pub fn ensure_array(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Looks up a dotted path (`payload.data.title`) in a JSON value.
pub fn get_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, key| match current {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
