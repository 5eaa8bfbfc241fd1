use conduit_access::{
    access_for_action, authorize_items, authorize_request, authorize_scheme, is_item_authorized,
    AccessDef, AccessScheme, Allow, RequestAuthorization,
};
use conduit_types::{Access, AccessStatus, Ident};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn def(value: Value) -> AccessDef {
    AccessDef::from_value(value)
}

fn request<'a>(action_type: &'a str, ident: Option<&'a Ident>) -> RequestAuthorization<'a> {
    RequestAuthorization {
        action_type,
        ident,
        has_type: true,
        requires_auth: false,
    }
}

// ── access_for_action ─────────────────────────────────────────────

#[test]
fn undeclared_access_is_empty_scheme() {
    let scheme = access_for_action(&AccessDef::Undeclared, "GET");
    assert_eq!(scheme, AccessScheme::default());
    assert_eq!(serde_json::to_value(&scheme).unwrap(), json!({}));
}

#[test]
fn null_access_denies() {
    let scheme = access_for_action(&def(json!(null)), "GET");
    assert_eq!(serde_json::to_value(&scheme).unwrap(), json!({ "allow": "none" }));
}

#[test]
fn unknown_allow_becomes_none() {
    let scheme = access_for_action(&def(json!({ "allow": "everybody" })), "GET");
    assert_eq!(scheme.allow, Some(Allow::None));
    let scheme = access_for_action(&def(json!("whatever")), "GET");
    assert_eq!(scheme.allow, Some(Allow::None));
}

#[test]
fn role_and_ident_are_coerced_to_arrays() {
    let scheme = access_for_action(&def(json!({ "role": "admin", "ident": ["johnf", "betty"] })), "GET");
    assert_eq!(scheme.role, vec!["admin".to_string()]);
    assert_eq!(scheme.ident, vec!["johnf".to_string(), "betty".to_string()]);
    assert_eq!(scheme.allow, None);
}

#[test]
fn action_override_replaces_whole_scheme() {
    let access = def(json!({
        "allow": "all",
        "actions": { "SET": { "role": "admin" }, "DELETE": null }
    }));

    assert_eq!(access_for_action(&access, "GET"), AccessScheme::allow(Allow::All));
    let set = access_for_action(&access, "SET_META");
    assert_eq!(set.allow, None);
    assert_eq!(set.role, vec!["admin".to_string()]);
    assert_eq!(access_for_action(&access, "DELETE"), AccessScheme::deny());
}

#[test]
fn access_def_deserializes_null_as_deny() {
    #[derive(serde::Deserialize)]
    struct Holder {
        #[serde(default)]
        access: AccessDef,
    }

    let absent: Holder = serde_json::from_value(json!({})).unwrap();
    let null: Holder = serde_json::from_value(json!({ "access": null })).unwrap();
    assert_eq!(absent.access, AccessDef::Undeclared);
    assert_eq!(null.access, AccessDef::Deny);
}

// ── Request-level ─────────────────────────────────────────────────

#[test]
fn root_is_always_granted() {
    let root = Ident::root();
    let access = authorize_request(&def(json!(null)), request("GET", Some(&root)));
    assert_eq!(access.status, AccessStatus::Granted);
}

#[test]
fn action_without_type_is_granted() {
    let access = authorize_request(
        &def(json!(null)),
        RequestAuthorization {
            has_type: false,
            ..request("GET_META", None)
        },
    );
    assert_eq!(access.status, AccessStatus::Granted);
}

#[test]
fn allow_all_grants_anonymous() {
    let access = authorize_request(&def(json!("all")), request("GET", None));
    assert_eq!(access.status, AccessStatus::Granted);
}

#[test]
fn allow_auth_requires_ident() {
    let johnf = Ident::new("johnf");
    assert_eq!(
        authorize_request(&def(json!("auth")), request("GET", None)).status,
        AccessStatus::Refused
    );
    let granted = authorize_request(&def(json!("auth")), request("GET", Some(&johnf)));
    assert_eq!(granted.status, AccessStatus::Granted);
    assert_eq!(granted.ident, Some(johnf));
}

#[test]
fn allow_none_refuses_ident() {
    let johnf = Ident::new("johnf");
    let access = authorize_request(&def(json!("none")), request("GET", Some(&johnf)));
    assert_eq!(access.status, AccessStatus::Refused);
}

#[test]
fn role_scheme_checks_membership() {
    let access = def(json!({ "role": "admin" }));
    let admin = Ident::new("betty").with_roles(["admin"]);
    let editor = Ident::new("johnf").with_roles(["editor"]);

    assert_eq!(authorize_request(&access, request("GET", Some(&admin))).status, AccessStatus::Granted);
    assert_eq!(authorize_request(&access, request("GET", Some(&editor))).status, AccessStatus::Refused);
    assert_eq!(authorize_request(&access, request("GET", None)).status, AccessStatus::Refused);
}

#[test]
fn ident_scheme_checks_membership() {
    let access = def(json!({ "ident": "johnf" }));
    let johnf = Ident::new("johnf");
    let betty = Ident::new("betty");

    assert_eq!(authorize_request(&access, request("GET", Some(&johnf))).status, AccessStatus::Granted);
    assert_eq!(authorize_request(&access, request("GET", Some(&betty))).status, AccessStatus::Refused);
}

#[test]
fn field_schemes_are_deferred_to_items() {
    let access = def(json!({ "identFromField": "author" }));
    let betty = Ident::new("betty");

    assert_eq!(authorize_request(&access, request("GET", Some(&betty))).status, AccessStatus::Granted);
    assert_eq!(authorize_request(&access, request("GET", None)).status, AccessStatus::Refused);
}

#[test]
fn empty_scheme_refuses_anonymous_on_authenticated_service() {
    let open = authorize_request(&AccessDef::Undeclared, request("GET", None));
    assert_eq!(open.status, AccessStatus::Granted);

    let authed = authorize_request(
        &AccessDef::Undeclared,
        RequestAuthorization {
            requires_auth: true,
            ..request("GET", None)
        },
    );
    assert_eq!(authed.status, AccessStatus::Refused);

    let johnf = Ident::new("johnf");
    let with_ident = authorize_request(
        &AccessDef::Undeclared,
        RequestAuthorization {
            requires_auth: true,
            ..request("GET", Some(&johnf))
        },
    );
    assert_eq!(with_ident.status, AccessStatus::Granted);
}

#[test]
fn scheme_decision_without_item() {
    let scheme = access_for_action(&def(json!({ "allow": "auth", "role": "admin" })), "GET");
    let editor = Ident::new("johnf").with_roles(["editor"]);
    assert!(!authorize_scheme(&scheme, Some(&editor), false));
}

// ── Item-level ────────────────────────────────────────────────────

#[test]
fn ident_from_field_matches_reference() {
    let scheme = access_for_action(&def(json!({ "identFromField": "author" })), "GET");
    let johnf = Ident::new("johnf");
    let own = json!({ "id": "ent1", "$type": "entry", "author": { "id": "johnf", "$ref": "user" } });
    let other = json!({ "id": "ent2", "$type": "entry", "author": { "id": "betty", "$ref": "user" } });

    assert!(is_item_authorized(&own, &scheme, Some(&johnf), false));
    assert!(!is_item_authorized(&other, &scheme, Some(&johnf), false));
}

#[test]
fn role_from_field_matches_any_role() {
    let scheme = access_for_action(&def(json!({ "roleFromField": "meta.groups" })), "GET");
    let editor = Ident::new("johnf").with_roles(["editor", "writer"]);
    let item = json!({ "id": "ent1", "meta": { "groups": ["admin", "writer"] } });
    let hidden = json!({ "id": "ent2", "meta": { "groups": "admin" } });

    assert!(is_item_authorized(&item, &scheme, Some(&editor), false));
    assert!(!is_item_authorized(&hidden, &scheme, Some(&editor), false));
}

fn entries() -> Vec<Value> {
    vec![
        json!({ "id": "ent1", "$type": "entry", "author": "johnf" }),
        json!({ "id": "ent2", "$type": "entry", "author": "betty" }),
        json!({ "id": "ent3", "$type": "entry", "author": "johnf" }),
    ]
}

fn author_scheme(item: &Value) -> Option<AccessScheme> {
    (item["$type"] == "entry").then(|| AccessScheme {
        ident_from_field: Some("author".to_string()),
        ..Default::default()
    })
}

#[test]
fn authorize_items_reports_partially() {
    let johnf = Ident::new("johnf");
    let result = authorize_items(entries(), None, Some(&johnf), false, author_scheme);

    let data = result.data.unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["id"], "ent1");
    assert_eq!(data[1]["id"], "ent3");
    assert_eq!(result.access.unwrap().status, AccessStatus::Partially);
}

#[test]
fn authorize_items_reports_granted_and_refused() {
    let root = Ident::root();
    let all = authorize_items(entries(), None, Some(&root), false, author_scheme);
    assert_eq!(all.data.unwrap().len(), 3);
    assert_eq!(all.access.unwrap().status, AccessStatus::Granted);

    let stranger = Ident::new("stranger");
    let none = authorize_items(entries(), None, Some(&stranger), false, author_scheme);
    assert_eq!(none.data, Some(vec![]));
    assert_eq!(none.access.unwrap().status, AccessStatus::Refused);
}

#[test]
fn authorize_items_drops_unknown_types() {
    let johnf = Ident::new("johnf");
    let items = vec![json!({ "id": "x", "$type": "unknown", "author": "johnf" })];
    let result = authorize_items(items, None, Some(&johnf), false, author_scheme);
    assert_eq!(result.access.unwrap().status, AccessStatus::Refused);
}

#[test]
fn authorize_items_short_circuits() {
    let johnf = Ident::new("johnf");
    let empty = authorize_items(vec![], None, Some(&johnf), false, author_scheme);
    assert_eq!(empty, Default::default());

    let refused = Access::refused(Some(johnf.clone()));
    let result = authorize_items(entries(), Some(&refused), Some(&johnf), false, author_scheme);
    assert!(result.data.is_none());
    assert!(result.access.is_none());
}
