//! Definitions and runtime resources.
//!
//! [`Defs`] is everything that can be written down: schemas, services with
//! their endpoints, named mappings and auths. It loads from JSON or TOML.
//! [`Resources`] is what the host supplies in code: adapters,
//! authenticators and transformers, keyed by the ids the definitions use.

use crate::auth::Authenticator;
use crate::error::{ConfigError, ConfigResult};
use conduit_endpoint::{Adapter, EndpointDef};
use conduit_mapping::{MappingDef, Transformer, Transformers};
use conduit_schema::SchemaDef;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// A service as written in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDef {
    pub id: String,
    /// Id of the adapter in [`Resources::adapters`].
    pub adapter: String,
    /// Id of an [`AuthDef`]. Services without auth do not authenticate.
    #[serde(default)]
    pub auth: Option<String>,
    /// Options for the adapter, merged under every endpoint's options.
    #[serde(default)]
    pub options: Value,
    #[serde(default)]
    pub endpoints: Vec<EndpointDef>,
    /// Mapping per type: the id of a named mapping, or an inline mapping
    /// definition.
    #[serde(default)]
    pub mappings: BTreeMap<String, Value>,
}

impl ServiceDef {
    pub fn new(id: impl Into<String>, adapter: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            adapter: adapter.into(),
            ..Self::default()
        }
    }

    pub fn with_auth(mut self, auth: impl Into<String>) -> Self {
        self.auth = Some(auth.into());
        self
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    pub fn with_endpoint(mut self, endpoint: EndpointDef) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_mapping(mut self, type_name: impl Into<String>, mapping: impl Into<Value>) -> Self {
        self.mappings.insert(type_name.into(), mapping.into());
        self
    }
}

/// An auth as written in configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthDef {
    pub id: String,
    /// Id of the authenticator in [`Resources::authenticators`].
    pub authenticator: String,
    #[serde(default)]
    pub options: Value,
}

impl AuthDef {
    pub fn new(id: impl Into<String>, authenticator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            authenticator: authenticator.into(),
            options: Value::Null,
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }
}

/// All definitions of an instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Defs {
    #[serde(default)]
    pub schemas: Vec<SchemaDef>,
    #[serde(default)]
    pub services: Vec<ServiceDef>,
    #[serde(default)]
    pub mappings: Vec<MappingDef>,
    #[serde(default)]
    pub auths: Vec<AuthDef>,
}

impl Defs {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_toml_str(toml: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Loads definitions from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let defs = match format.as_deref() {
            Some("json") => Self::from_json_str(&std::fs::read_to_string(path)?)?,
            Some("toml") => Self::from_toml_str(&std::fs::read_to_string(path)?)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        info!(
            path = %path.display(),
            schemas = defs.schemas.len(),
            services = defs.services.len(),
            "loaded definitions"
        );
        Ok(defs)
    }
}

/// Collaborators supplied by the host, resolved by id when an instance is
/// built.
#[derive(Clone, Default)]
pub struct Resources {
    pub adapters: HashMap<String, Arc<dyn Adapter>>,
    pub authenticators: HashMap<String, Arc<dyn Authenticator>>,
    pub transformers: Transformers,
}

impl Resources {
    /// Starts with the builtin transformers.
    pub fn new() -> Self {
        Self {
            transformers: Transformers::with_builtins(),
            ..Self::default()
        }
    }

    pub fn with_adapter(mut self, id: impl Into<String>, adapter: Arc<dyn Adapter>) -> Self {
        self.adapters.insert(id.into(), adapter);
        self
    }

    pub fn with_authenticator(mut self, id: impl Into<String>, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticators.insert(id.into(), authenticator);
        self
    }

    pub fn with_transformer(mut self, name: impl Into<String>, transformer: impl Transformer + 'static) -> Self {
        self.transformers.register(name, transformer);
        self
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adapters: Vec<_> = self.adapters.keys().collect();
        adapters.sort();
        let mut authenticators: Vec<_> = self.authenticators.keys().collect();
        authenticators.sort();
        f.debug_struct("Resources")
            .field("adapters", &adapters)
            .field("authenticators", &authenticators)
            .field("transformers", &self.transformers)
            .finish()
    }
}
