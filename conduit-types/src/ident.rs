use serde::{Deserialize, Serialize};

/// The authenticated identity issuing an action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// A root ident bypasses every access check.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tokens: Vec<String>,
}

impl Ident {
    /// Creates an ident with the given id and no roles.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Creates the root ident.
    pub fn root() -> Self {
        Self {
            id: Some("root".to_string()),
            root: true,
            ..Default::default()
        }
    }

    /// Adds roles to the ident.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessStatus {
    Granted,
    /// Some, but not all, items were authorized.
    Partially,
    Refused,
}

/// Access decision attached to requests and responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Access {
    pub status: AccessStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ident: Option<Ident>,
}

impl Access {
    pub fn new(status: AccessStatus, ident: Option<Ident>) -> Self {
        Self { status, ident }
    }

    pub fn granted(ident: Option<Ident>) -> Self {
        Self::new(AccessStatus::Granted, ident)
    }

    pub fn refused(ident: Option<Ident>) -> Self {
        Self::new(AccessStatus::Refused, ident)
    }

    pub fn is_refused(&self) -> bool {
        self.status == AccessStatus::Refused
    }
}
