use crate::Access;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Response status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Queued,
    NoAction,
    NotFound,
    NoAccess,
    AuthError,
    Timeout,
    Error,
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Queued => "queued",
            Self::NoAction => "noaction",
            Self::NotFound => "notfound",
            Self::NoAccess => "noaccess",
            Self::AuthError => "autherror",
            Self::Timeout => "timeout",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of an action or of a single service exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<Access>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl Response {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            data: None,
            error: None,
            access: None,
            paging: None,
            params: Map::new(),
        }
    }

    pub fn ok(data: Option<Value>) -> Self {
        Self {
            data,
            ..Self::new(Status::Ok)
        }
    }

    pub fn noaction() -> Self {
        Self::new(Status::NoAction)
    }

    /// A response with the given failure status and message.
    pub fn failure(status: Status, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(status)
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::failure(Status::Error, error)
    }

    pub fn noaccess(error: impl Into<String>) -> Self {
        Self::failure(Status::NoAccess, error)
    }

    pub fn with_access(mut self, access: Option<Access>) -> Self {
        self.access = access;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}
