mod common;

use common::{defs, entries_service, entry_schema, init_tracing, setup, user_schema};
use conduit_endpoint::adapter::mock::MockAdapter;
use conduit_endpoint::{EndpointDef, EndpointError};
use conduit_mapping::{MappingDef, MappingError};
use conduit_schema::{SchemaDef, SchemaError};
use conduit_service::auth::mock::MockAuthenticator;
use conduit_service::{AuthDef, Defs, Instance, Resources, ServiceDef, SetupError};
use conduit_types::{Action, Ident, Response, Scope, Status};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn resources() -> Resources {
    Resources::new()
        .with_adapter("mock", Arc::new(MockAdapter::new()))
        .with_authenticator("mock", Arc::new(MockAuthenticator::new()))
}

fn setup_error(defs: Defs) -> SetupError {
    init_tracing();
    Instance::new(defs, resources()).unwrap_err()
}

// ── Routing ──────────────────────────────────────────────────────

#[tokio::test]
async fn routes_by_the_schema_service() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());

    let response = setup.instance.dispatch(Action::new("GET").with_type("entry")).await;

    assert_eq!(response.status, Status::Ok);
    assert_eq!(setup.adapter.send_count(), 1);
}

#[tokio::test]
async fn payload_service_wins_over_the_schema_service() {
    let schema = SchemaDef::new("entry", json!({ "title": "string" })).with_service("archive");
    let setup = setup(defs(vec![schema], entries_service()), MockAdapter::new());

    let response = setup
        .instance
        .dispatch(Action::new("GET").with_type("entry").with_service("entries"))
        .await;

    assert_eq!(response.status, Status::Ok);
}

#[tokio::test]
async fn unknown_service_is_an_error() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());

    let response = setup
        .instance
        .dispatch(Action::new("GET").with_type("entry").with_service("archive"))
        .await;

    assert_eq!(response.status, Status::Error);
    assert!(response.error.unwrap().contains("unknown service 'archive'"));
}

#[tokio::test]
async fn type_without_service_is_an_error() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());

    let typed = setup.instance.dispatch(Action::new("GET").with_type("comment")).await;
    let untyped = setup.instance.dispatch(Action::new("GET")).await;

    assert_eq!(typed.status, Status::Error);
    assert!(typed.error.unwrap().contains("comment"));
    assert_eq!(untyped.status, Status::Error);
    assert_eq!(setup.adapter.send_count(), 0);
}

#[tokio::test]
async fn other_verbs_go_straight_to_the_service() {
    let adapter = MockAdapter::new().with_response(Response::ok(Some(json!({ "lastSyncedAt": "2024-01-01" }))));
    let setup = setup(defs(vec![entry_schema()], entries_service()), adapter);

    let meta = setup
        .instance
        .dispatch(Action::new("GET_META").with_type("entry"))
        .await;
    let unknown = setup.instance.dispatch(Action::new("SYNC").with_type("entry")).await;

    assert_eq!(meta.status, Status::Ok);
    assert_eq!(meta.data, Some(json!({ "lastSyncedAt": "2024-01-01" })));
    assert_eq!(unknown.status, Status::NoAction);
}

// ── GET ──────────────────────────────────────────────────────────

#[tokio::test]
async fn get_member_answers_with_the_item() {
    let adapter = MockAdapter::new().with_response(Response::ok(Some(json!([{ "id": "ent1", "title": "Hello" }]))));
    let setup = setup(defs(vec![entry_schema()], entries_service()), adapter);
    let action = Action::new("GET").with_type("entry").with_id("ent1");
    assert_eq!(action.payload.scope(), Scope::Member);

    let response = setup.instance.dispatch(action).await;

    assert_eq!(response.status, Status::Ok);
    assert_eq!(
        response.data,
        Some(json!({ "id": "ent1", "$type": "entry", "title": "Hello" }))
    );
}

#[tokio::test]
async fn get_member_without_result_is_notfound() {
    let adapter = MockAdapter::new().with_response(Response::ok(Some(json!([]))));
    let setup = setup(defs(vec![entry_schema()], entries_service()), adapter);

    let response = setup
        .instance
        .dispatch(Action::new("GET").with_type("entry").with_id("ent404"))
        .await;

    assert_eq!(response.status, Status::NotFound);
    assert!(response.error.unwrap().contains("ent404"));
}

#[tokio::test]
async fn get_collection_keeps_the_list() {
    let adapter = MockAdapter::new().with_response(Response::ok(Some(json!([{ "id": "ent1" }]))));
    let setup = setup(defs(vec![entry_schema()], entries_service()), adapter);

    let response = setup.instance.dispatch(Action::new("GET").with_type("entry")).await;

    assert_eq!(response.data, Some(json!([{ "id": "ent1", "$type": "entry" }])));
}

#[tokio::test]
async fn get_prefers_the_most_specific_endpoint() {
    let service = ServiceDef::new("entries", "mock")
        .with_endpoint(EndpointDef::new().with_options(json!({ "uri": "/entries" })))
        .with_endpoint(
            EndpointDef::new()
                .with_scope(Scope::Member)
                .with_options(json!({ "uri": "/entries/{id}" })),
        );
    let setup = setup(defs(vec![entry_schema()], service), MockAdapter::new());

    setup
        .instance
        .dispatch(Action::new("GET").with_type("entry").with_id("ent1"))
        .await;
    setup.instance.dispatch(Action::new("GET").with_type("entry")).await;

    let uris: Vec<_> = setup
        .adapter
        .sent_requests()
        .into_iter()
        .map(|request| request.endpoint["uri"].clone())
        .collect();
    assert_eq!(uris, vec![json!("/entries/{id}"), json!("/entries")]);
}

// ── SET ──────────────────────────────────────────────────────────

#[tokio::test]
async fn set_without_data_is_noaction() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());

    let response = setup.instance.dispatch(Action::new("SET").with_type("entry")).await;

    assert_eq!(response.status, Status::NoAction);
    assert_eq!(setup.adapter.send_count(), 0);
}

#[tokio::test]
async fn set_answers_with_written_items_when_the_service_is_silent() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());
    let action = Action::new("SET")
        .with_type("entry")
        .with_data(json!([{ "id": "ent1", "title": "Hello", "views": "3" }]))
        .with_ident(Ident::new("johnf"));

    let response = setup.instance.dispatch(action).await;

    assert_eq!(response.status, Status::Ok);
    assert_eq!(
        response.data,
        Some(json!([{ "id": "ent1", "$type": "entry", "title": "Hello", "views": 3 }]))
    );
}

#[tokio::test]
async fn set_answers_with_service_data_when_given() {
    let adapter = MockAdapter::new().with_response(Response::ok(Some(json!([{ "id": "ent1", "views": 4 }]))));
    let setup = setup(defs(vec![entry_schema()], entries_service()), adapter);
    let action = Action::new("SET")
        .with_type("entry")
        .with_data(json!({ "id": "ent1", "views": 3 }));

    let response = setup.instance.dispatch(action).await;

    assert_eq!(response.data, Some(json!([{ "id": "ent1", "$type": "entry", "views": 4 }])));
}

// ── DELETE ───────────────────────────────────────────────────────

#[tokio::test]
async fn delete_builds_items_from_id_and_type() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());

    let response = setup
        .instance
        .dispatch(Action::new("DELETE").with_type("entry").with_id(vec!["ent1", "ent2"]))
        .await;

    assert_eq!(response.status, Status::Ok);
    let sent = setup.adapter.sent_requests();
    assert_eq!(sent[0].data, Some(json!([{ "id": "ent1" }, { "id": "ent2" }])));
}

#[tokio::test]
async fn delete_without_id_or_data_is_noaction() {
    let setup = setup(defs(vec![entry_schema()], entries_service()), MockAdapter::new());

    let response = setup.instance.dispatch(Action::new("DELETE").with_type("entry")).await;

    assert_eq!(response.status, Status::NoAction);
    assert_eq!(setup.adapter.send_count(), 0);
}

// ── Setup errors ─────────────────────────────────────────────────

#[test]
fn unknown_adapter_is_a_setup_error() {
    let err = setup_error(defs(vec![entry_schema()], ServiceDef::new("entries", "http")));
    assert!(matches!(err, SetupError::UnknownAdapter { adapter, .. } if adapter == "http"));
}

#[test]
fn unknown_auth_is_a_setup_error() {
    let err = setup_error(defs(vec![entry_schema()], entries_service().with_auth("oauth")));
    assert!(matches!(err, SetupError::UnknownAuth { auth, .. } if auth == "oauth"));
}

#[test]
fn unknown_authenticator_is_a_setup_error() {
    let mut defs = defs(vec![entry_schema()], entries_service());
    defs.auths.push(AuthDef::new("oauth", "oauth2"));
    let err = setup_error(defs);
    assert!(matches!(err, SetupError::UnknownAuthenticator { authenticator, .. } if authenticator == "oauth2"));
}

#[test]
fn duplicate_ids_are_setup_errors() {
    let mut twice = defs(vec![entry_schema()], entries_service());
    twice.services.push(entries_service());
    assert!(matches!(setup_error(twice), SetupError::DuplicateService(id) if id == "entries"));

    let mut twice = defs(vec![entry_schema()], entries_service());
    twice.auths.push(AuthDef::new("token", "mock"));
    assert!(matches!(setup_error(twice), SetupError::DuplicateAuth(id) if id == "token"));
}

#[test]
fn mapping_problems_are_setup_errors() {
    let unknown_type = setup_error(defs(vec![entry_schema()], entries_service().with_mapping("comment", json!({}))));
    assert!(matches!(unknown_type, SetupError::UnknownType { type_name, .. } if type_name == "comment"));

    let unknown_named = setup_error(defs(vec![entry_schema()], entries_service().with_mapping("entry", "entry-v2")));
    assert!(matches!(unknown_named, SetupError::UnknownMapping { mapping, .. } if mapping == "entry-v2"));

    let mut bad = defs(vec![entry_schema()], entries_service());
    bad.mappings.push(MappingDef::new("broken", json!({ "title": { "$transform": "shout" } })));
    assert!(matches!(setup_error(bad), SetupError::Mapping(MappingError::UnknownTransformer(_))));
}

#[test]
fn endpoint_and_schema_problems_are_setup_errors() {
    let service = entries_service().with_endpoint(EndpointDef::new().with_adapter("missing"));
    let err = setup_error(defs(vec![entry_schema()], service));
    assert!(matches!(err, SetupError::Endpoint(EndpointError::UnknownAdapter(_))));

    let schema = SchemaDef::new("entry", json!({ "id": "integer" }));
    let err = setup_error(defs(vec![schema], entries_service()));
    assert!(matches!(err, SetupError::Schema(SchemaError::InvalidShape(_))));
}

#[test]
fn instance_exposes_schemas_and_services() {
    let setup = setup(defs(vec![entry_schema(), user_schema()], entries_service()), MockAdapter::new());
    assert_eq!(setup.instance.schemas().len(), 2);
    assert_eq!(setup.instance.service("entries").unwrap().endpoints().len(), 1);
    assert!(setup.instance.service("archive").is_none());
}
