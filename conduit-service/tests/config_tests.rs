mod common;

use common::init_tracing;
use conduit_endpoint::adapter::mock::MockAdapter;
use conduit_service::auth::mock::MockAuthenticator;
use conduit_service::{ConfigError, Defs, Instance, Resources};
use conduit_types::{Action, Ident, Response, Scope, Status};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;

const DEFS_JSON: &str = r#"{
  "schemas": [
    { "id": "entry", "service": "entries", "shape": { "title": "string", "views": "integer" }, "access": "auth" }
  ],
  "mappings": [
    { "id": "entry-from-api", "mapping": { "id": "key", "title": "headline", "views": "stats.views" } }
  ],
  "services": [
    {
      "id": "entries",
      "adapter": "mock",
      "auth": "token",
      "options": { "baseUri": "https://api.test" },
      "mappings": { "entry": "entry-from-api" },
      "endpoints": [
        { "options": { "uri": "/entries" } },
        { "id": "get-one", "match": { "scope": "member", "action": "GET" }, "options": { "uri": "/entries/{id}" } }
      ]
    }
  ],
  "auths": [{ "id": "token", "authenticator": "mock", "options": { "key": "s3cr3t" } }]
}"#;

const DEFS_TOML: &str = r#"
[[schemas]]
id = "entry"
service = "entries"
access = "auth"

[schemas.shape]
title = "string"
views = "integer"

[[mappings]]
id = "entry-from-api"

[mappings.mapping]
id = "key"
title = "headline"
views = "stats.views"

[[services]]
id = "entries"
adapter = "mock"
auth = "token"

[services.options]
baseUri = "https://api.test"

[services.mappings]
entry = "entry-from-api"

[[services.endpoints]]

[services.endpoints.options]
uri = "/entries"

[[services.endpoints]]
id = "get-one"

[services.endpoints.match]
scope = "member"
action = "GET"

[services.endpoints.options]
uri = "/entries/{id}"

[[auths]]
id = "token"
authenticator = "mock"

[auths.options]
key = "s3cr3t"
"#;

fn write_defs(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn assert_entries_defs(defs: &Defs) {
    assert_eq!(defs.schemas.len(), 1);
    assert_eq!(defs.schemas[0].service.as_deref(), Some("entries"));
    assert_eq!(defs.mappings[0].id, "entry-from-api");
    assert_eq!(defs.auths[0].options, json!({ "key": "s3cr3t" }));

    let service = &defs.services[0];
    assert_eq!(service.adapter, "mock");
    assert_eq!(service.auth.as_deref(), Some("token"));
    assert_eq!(service.mappings["entry"], json!("entry-from-api"));
    assert_eq!(service.endpoints.len(), 2);
    assert_eq!(service.endpoints[1].id.as_deref(), Some("get-one"));
    assert!(service.endpoints[1].match_.scope.as_ref().unwrap().contains(&Scope::Member));
}

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_json_definitions() {
    let defs = Defs::from_json_str(DEFS_JSON).unwrap();
    assert_entries_defs(&defs);
}

#[test]
fn parses_toml_definitions() {
    let defs = Defs::from_toml_str(DEFS_TOML).unwrap();
    assert_entries_defs(&defs);
}

#[test]
fn missing_sections_default_to_empty() {
    let defs = Defs::from_json_str("{}").unwrap();
    assert!(defs.schemas.is_empty());
    assert!(defs.services.is_empty());
    assert!(defs.mappings.is_empty());
    assert!(defs.auths.is_empty());
}

#[test]
fn invalid_definitions_are_config_errors() {
    assert!(matches!(Defs::from_json_str("{ \"schemas\": 3 }"), Err(ConfigError::Json(_))));
    assert!(matches!(Defs::from_toml_str("[[schemas]\nid ="), Err(ConfigError::Toml(_))));
}

// ── Loading files ────────────────────────────────────────────────

#[test]
fn loads_by_file_extension() {
    init_tracing();
    let json = write_defs(".json", DEFS_JSON);
    let toml = write_defs(".toml", DEFS_TOML);

    assert_entries_defs(&Defs::load(json.path()).unwrap());
    assert_entries_defs(&Defs::load(toml.path()).unwrap());
}

#[test]
fn unknown_extension_is_unsupported() {
    let yaml = write_defs(".yaml", "schemas: []");
    assert!(matches!(Defs::load(yaml.path()), Err(ConfigError::UnsupportedFormat(path)) if path == yaml.path()));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Defs::load(dir.path().join("missing.json"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

// ── Loaded instance ──────────────────────────────────────────────

#[tokio::test]
async fn loaded_definitions_build_a_working_instance() {
    init_tracing();
    let file = write_defs(".toml", DEFS_TOML);
    let adapter = Arc::new(
        MockAdapter::new().with_response(Response::ok(Some(json!([
            { "key": "ent1", "headline": "Hello", "stats": { "views": "12" } }
        ])))),
    );
    let resources = Resources::new()
        .with_adapter("mock", adapter.clone())
        .with_authenticator("mock", Arc::new(MockAuthenticator::new()));
    let instance = Instance::new(Defs::load(file.path()).unwrap(), resources).unwrap();

    let response = instance
        .dispatch(
            Action::new("GET")
                .with_type("entry")
                .with_id("ent1")
                .with_ident(Ident::new("johnf")),
        )
        .await;

    assert_eq!(response.status, Status::Ok);
    assert_eq!(
        response.data,
        Some(json!({ "id": "ent1", "$type": "entry", "title": "Hello", "views": 12 }))
    );
    let sent = adapter.sent_requests();
    assert_eq!(
        sent[0].endpoint,
        json!({ "baseUri": "https://api.test", "uri": "/entries/{id}" })
    );
}
