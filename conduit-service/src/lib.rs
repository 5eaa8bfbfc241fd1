//! Services and the action dispatcher for conduit.
//!
//! # Architecture
//!
//! An [`Instance`] is built from [`Defs`] (what can be written in a JSON or
//! TOML file) and [`Resources`] (adapters, authenticators and transformers
//! supplied in code). Every string id in the definitions is resolved when
//! the instance is built; a missing id is a [`SetupError`].
//!
//! ## Components
//!
//! - **Service**: sorted endpoints, per-type mappings, an optional auth and
//!   a cached connection. [`Service::send`] runs the send pipeline.
//! - **Auth**: an [`Authenticator`] bound to its options, with a cached
//!   authentication shared by every service using it.
//! - **Instance**: routes actions to services and shapes `GET`, `SET` and
//!   `DELETE` responses.
//!
//! ## Errors
//!
//! Once an instance is built nothing returns `Err`. Every failure of an
//! action is a response status: `noaction`, `notfound`, `noaccess`,
//! `autherror`, `timeout` or `error`.
//!
//! # Example
//!
//! ```
//! use conduit_endpoint::adapter::mock::MockAdapter;
//! use conduit_endpoint::EndpointDef;
//! use conduit_schema::SchemaDef;
//! use conduit_service::{Defs, Instance, Resources, ServiceDef};
//! use conduit_types::Action;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let defs = Defs {
//!     schemas: vec![SchemaDef::new("entry", json!({ "title": "string" })).with_service("entries")],
//!     services: vec![ServiceDef::new("entries", "mock").with_endpoint(EndpointDef::new())],
//!     ..Defs::default()
//! };
//! let resources = Resources::new().with_adapter("mock", Arc::new(MockAdapter::new()));
//! let instance = Instance::new(defs, resources).unwrap();
//!
//! let runtime = tokio::runtime::Runtime::new().unwrap();
//! let response = runtime.block_on(instance.dispatch(Action::new("GET").with_type("entry")));
//! assert!(response.is_ok());
//! ```

pub mod auth;
mod config;
mod error;
mod instance;
mod service;

pub use auth::{Auth, AuthStatus, Authentication, Authenticator};
pub use config::{AuthDef, Defs, Resources, ServiceDef};
pub use error::{ConfigError, ConfigResult, SetupError, SetupResult};
pub use instance::Instance;
pub use service::{Outcome, Service, ServiceContext, ACTIONS};
