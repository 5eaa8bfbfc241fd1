#![allow(dead_code)]

use conduit_endpoint::adapter::mock::MockAdapter;
use conduit_endpoint::EndpointDef;
use conduit_schema::SchemaDef;
use conduit_service::auth::mock::MockAuthenticator;
use conduit_service::{AuthDef, Defs, Instance, Resources, ServiceDef};
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Shows pipeline traces with `RUST_LOG=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn entry_schema() -> SchemaDef {
    SchemaDef::new(
        "entry",
        json!({ "title": "string", "views": "integer", "author": "user" }),
    )
    .with_service("entries")
}

pub fn user_schema() -> SchemaDef {
    SchemaDef::new("user", json!({ "name": "string" })).with_service("entries")
}

/// The `entries` service with a single catch-all endpoint.
pub fn entries_service() -> ServiceDef {
    ServiceDef::new("entries", "mock").with_endpoint(EndpointDef::new())
}

pub fn defs(schemas: Vec<SchemaDef>, service: ServiceDef) -> Defs {
    Defs {
        schemas,
        services: vec![service],
        auths: vec![AuthDef::new("token", "mock")],
        ..Defs::default()
    }
}

pub struct Setup {
    pub instance: Instance,
    pub adapter: Arc<MockAdapter>,
    pub authenticator: Arc<MockAuthenticator>,
}

pub fn setup(defs: Defs, adapter: MockAdapter) -> Setup {
    setup_with_auth(defs, adapter, MockAuthenticator::new())
}

pub fn setup_with_auth(defs: Defs, adapter: MockAdapter, authenticator: MockAuthenticator) -> Setup {
    init_tracing();
    let adapter = Arc::new(adapter);
    let authenticator = Arc::new(authenticator);
    let resources = Resources::new()
        .with_adapter("mock", adapter.clone())
        .with_authenticator("mock", authenticator.clone());
    let instance = Instance::new(defs, resources).unwrap();
    Setup {
        instance,
        adapter,
        authenticator,
    }
}
