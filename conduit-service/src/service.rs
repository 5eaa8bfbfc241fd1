//! A service and the pipeline every action sent to it runs through.
//!
//! Sending an action is one sequential pass over an [`Exchange`]:
//!
//! 1. unknown verbs answer `noaction`, unmatched actions answer `error`
//! 2. outgoing data is cast with the schema of each item's type
//! 3. the request is authorized, then every outgoing item
//! 4. the authorized data is kept for the caller
//! 5. items are mapped to the service shape and the endpoint shapes the request
//! 6. the service auth authenticates
//! 7. the adapter connects, reusing the cached connection
//! 8. the adapter sends, unless access was refused, and normalizes
//! 9. the endpoint shapes the response and items are mapped back and cast
//! 10. returned items are authorized
//!
//! Once a stage has produced a response, the request stages left are
//! skipped. The response stages still run.

use crate::auth::{Auth, AuthStatus};
use crate::config::ServiceDef;
use crate::error::{SetupError, SetupResult};
use conduit_access::{authorize_items, authorize_request, AccessDef, AccessScheme, RequestAuthorization};
use conduit_endpoint::{select_endpoint, sort_endpoints, Adapter, Connection, Endpoint, EndpointContext};
use conduit_mapping::{Mapping, Mappings};
use conduit_schema::{CastOptions, Schemas};
use conduit_types::{ensure_array, item_type, Access, Action, Request, Response, Status};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Verbs a service sends. Anything else answers `noaction`.
pub const ACTIONS: &[&str] = &["GET", "SET", "DELETE", "GET_META", "SET_META", "GET_IDENT"];

/// Verbs whose data are typed items: cast, mapped per type and authorized
/// per item. The data of the other verbs pass through as they are.
fn is_data_action(action_type: &str) -> bool {
    matches!(action_type, "GET" | "SET" | "DELETE")
}

/// What a service needs from its instance when it is built.
pub struct ServiceContext<'a> {
    pub schemas: &'a Arc<Schemas>,
    pub mappings: &'a Mappings,
    pub adapters: &'a HashMap<String, Arc<dyn Adapter>>,
    pub auths: &'a HashMap<String, Arc<Auth>>,
}

/// The result of sending an action, with the outgoing data as it was after
/// authorization and before it was shaped for the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub response: Response,
    pub authorized_data: Option<Value>,
}

impl From<Response> for Outcome {
    fn from(response: Response) -> Self {
        Self {
            response,
            authorized_data: None,
        }
    }
}

/// A configured service: endpoints, per-type mappings, auth and the cached
/// connection.
pub struct Service {
    id: String,
    endpoints: Vec<Endpoint>,
    schemas: Arc<Schemas>,
    mappings: BTreeMap<String, Mapping>,
    auth: Option<Arc<Auth>>,
    connection: RwLock<Option<Connection>>,
}

/// The state of one action on its way through the pipeline.
struct Exchange<'a> {
    action: &'a Action,
    endpoint: &'a Endpoint,
    request: Request,
    access: Option<Access>,
    authorized_data: Option<Value>,
    connection: Option<Connection>,
    response: Option<Response>,
}

impl Service {
    /// Builds a service, resolving every id in the definition.
    pub fn new(def: ServiceDef, ctx: &ServiceContext<'_>) -> SetupResult<Self> {
        let adapter = ctx
            .adapters
            .get(&def.adapter)
            .cloned()
            .ok_or_else(|| SetupError::UnknownAdapter {
                service: def.id.clone(),
                adapter: def.adapter.clone(),
            })?;

        let auth = def
            .auth
            .as_ref()
            .map(|id| {
                ctx.auths.get(id).cloned().ok_or_else(|| SetupError::UnknownAuth {
                    service: def.id.clone(),
                    auth: id.clone(),
                })
            })
            .transpose()?;

        let mut mappings = BTreeMap::new();
        for (type_name, mapping) in &def.mappings {
            if !ctx.schemas.contains(type_name) {
                return Err(SetupError::UnknownType {
                    service: def.id.clone(),
                    type_name: type_name.clone(),
                });
            }
            let compiled = match mapping {
                Value::String(id) => ctx.mappings.get(id).cloned().ok_or_else(|| SetupError::UnknownMapping {
                    service: def.id.clone(),
                    type_name: type_name.clone(),
                    mapping: id.clone(),
                })?,
                inline => ctx.mappings.compile(inline)?,
            };
            mappings.insert(type_name.clone(), compiled);
        }

        let endpoint_ctx = EndpointContext {
            service_id: &def.id,
            service_options: &def.options,
            adapter,
            adapters: ctx.adapters,
            mappings: ctx.mappings,
        };
        let mut endpoints = def
            .endpoints
            .into_iter()
            .map(|endpoint| Endpoint::new(endpoint, &endpoint_ctx))
            .collect::<Result<Vec<_>, _>>()?;
        sort_endpoints(&mut endpoints);

        debug!(
            service = %def.id,
            endpoints = endpoints.len(),
            types = mappings.len(),
            "built service"
        );
        Ok(Self {
            id: def.id,
            endpoints,
            schemas: Arc::clone(ctx.schemas),
            mappings,
            auth,
            connection: RwLock::new(None),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Endpoints, most specific first.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Types this service has a mapping for.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    /// Whether requests to this service are authenticated.
    pub fn requires_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// The connection cached by the last successful connect.
    pub async fn connection(&self) -> Option<Connection> {
        self.connection.read().await.clone()
    }

    /// Sends an action through the pipeline. Failures are reported in the
    /// response status.
    pub async fn send(&self, action: &Action) -> Response {
        self.exchange(action).await.response
    }

    /// Like [`send`](Self::send), also returning the authorized outgoing
    /// data.
    pub async fn exchange(&self, action: &Action) -> Outcome {
        let action_type = action.type_.as_str();
        if !ACTIONS.contains(&action_type) {
            debug!(service = %self.id, action = action_type, "unknown action");
            return Response::failure(Status::NoAction, format!("unknown action '{action_type}'")).into();
        }

        let Some(endpoint) = select_endpoint(&self.endpoints, action) else {
            warn!(service = %self.id, action = action_type, "no matching endpoint");
            return Response::error(format!(
                "no endpoint matching {action_type} on service '{}'",
                self.id
            ))
            .into();
        };
        debug!(service = %self.id, action = action_type, endpoint = ?endpoint.id(), "sending action");

        let mut request = Request::from_action(action);
        request.endpoint = endpoint.options().clone();
        let mut ex = Exchange {
            action,
            endpoint,
            request,
            access: None,
            authorized_data: None,
            connection: None,
            response: None,
        };

        self.cast_request(&mut ex);
        self.authorize_request(&mut ex);
        ex.authorized_data = ex.request.data.clone();
        self.map_request(&mut ex).await;
        self.authenticate(&mut ex).await;
        self.connect(&mut ex).await;
        self.send_request(&mut ex).await;
        self.map_response(&mut ex).await;
        let response = self.authorize_response(&mut ex);

        debug!(service = %self.id, action = action_type, status = %response.status, "action done");
        Outcome {
            response,
            authorized_data: ex.authorized_data,
        }
    }

    fn cast_request(&self, ex: &mut Exchange<'_>) {
        if ex.response.is_some() || !is_data_action(&ex.action.type_) || ex.action.payload.unmapped {
            return;
        }
        let Some(data) = ex.request.data.take() else {
            return;
        };

        let types = ex.action.payload.types();
        let default_type = (types.len() == 1).then(|| types[0]);
        let cast = |item: &Value| -> Option<Value> {
            let type_name = item_type(item).or(default_type)?;
            self.schemas.get(type_name)?.cast(item, CastOptions::forward())
        };
        ex.request.data = match &data {
            Value::Array(items) => Some(Value::Array(items.iter().filter_map(cast).collect())),
            item => cast(item),
        };
        debug!(service = %self.id, "cast request data");
    }

    fn authorize_request(&self, ex: &mut Exchange<'_>) {
        if ex.response.is_some() {
            return;
        }
        let action = ex.action;
        let ident = action.meta.ident.as_ref();
        let types = action.payload.types();
        let authorization = RequestAuthorization {
            action_type: &action.type_,
            ident,
            has_type: !types.is_empty(),
            requires_auth: self.requires_auth(),
        };

        let undeclared = AccessDef::Undeclared;
        let mut access = types
            .iter()
            .map(|type_name| self.schemas.get(type_name).map_or(&undeclared, |schema| &schema.access))
            .map(|def| authorize_request(def, authorization))
            .find(Access::is_refused)
            .unwrap_or_else(|| Access::granted(ident.cloned()));

        if action.payload.unmapped && !ident.is_some_and(|ident| ident.root) {
            debug!(service = %self.id, "unmapped request refused to non-root ident");
            access = Access::refused(ident.cloned());
        }

        if !access.is_refused() && is_data_action(&action.type_) && !action.payload.unmapped {
            if let Some(data) = ex.request.data.take() {
                let is_array = data.is_array();
                let items = ensure_array(data);
                if items.is_empty() {
                    ex.request.data = reshape(items, is_array);
                } else {
                    let authorized = authorize_items(items, Some(&access), ident, self.requires_auth(), |item| {
                        self.scheme_for(item, &action.type_)
                    });
                    ex.request.data = reshape(authorized.data.unwrap_or_default(), is_array);
                    if let Some(item_access) = authorized.access {
                        access = item_access;
                    }
                }
            }
        }

        debug!(service = %self.id, status = ?access.status, "authorized request");
        ex.request.access = Some(access.clone());
        ex.access = Some(access);
    }

    async fn map_request(&self, ex: &mut Exchange<'_>) {
        if ex.response.is_some() {
            return;
        }
        if is_data_action(&ex.action.type_) && !ex.action.payload.unmapped {
            if let Some(data) = ex.request.data.take() {
                ex.request.data = self.map_to_service(data);
            }
        }

        let request = std::mem::take(&mut ex.request);
        match ex.endpoint.mutate_request(request).await {
            Ok(request) => ex.request = request,
            Err(err) => {
                warn!(service = %self.id, error = %err, "request mutation failed");
                ex.response = Some(Response::error(format!(
                    "could not prepare request for service '{}': {err}",
                    self.id
                )));
            }
        }
    }

    async fn authenticate(&self, ex: &mut Exchange<'_>) {
        if ex.response.is_some() {
            return;
        }
        let Some(auth) = &self.auth else {
            return;
        };

        let authentication = auth.authenticate().await;
        let status = match authentication.status {
            AuthStatus::Granted => {
                if let Some(scheme) = ex.endpoint.adapter().authentication_scheme() {
                    ex.request.auth = auth.as_scheme(scheme, &authentication);
                }
                return;
            }
            AuthStatus::Timeout => Status::Timeout,
            AuthStatus::Refused | AuthStatus::Error => Status::AuthError,
        };

        let reason = authentication.error.as_deref().unwrap_or("no reason given");
        warn!(service = %self.id, auth = auth.id(), status = ?authentication.status, reason, "authentication failed");
        ex.response = Some(Response::failure(
            status,
            format!("could not authenticate service '{}': {reason}", self.id),
        ));
    }

    async fn connect(&self, ex: &mut Exchange<'_>) {
        if ex.response.is_some() {
            return;
        }
        let cached = self.connection.read().await.clone();
        let result = ex
            .endpoint
            .adapter()
            .connect(ex.endpoint.options(), ex.request.auth.as_ref(), cached.as_ref())
            .await;

        match result {
            Ok(connection) if connection.status == Status::NoAction => {
                debug!(service = %self.id, "connect answered noaction, clearing connection");
                *self.connection.write().await = None;
            }
            Ok(connection) if connection.status.is_ok() => {
                if cached.as_ref() != Some(&connection) {
                    debug!(service = %self.id, "caching new connection");
                    *self.connection.write().await = Some(connection.clone());
                }
                ex.connection = Some(connection);
            }
            Ok(connection) => {
                *self.connection.write().await = None;
                let reason = connection
                    .data
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or(connection.status.as_str());
                warn!(service = %self.id, reason, "could not connect");
                ex.response = Some(Response::error(format!(
                    "could not connect to service '{}': {reason}",
                    self.id
                )));
            }
            Err(err) => {
                *self.connection.write().await = None;
                warn!(service = %self.id, error = %err, "could not connect");
                ex.response = Some(Response::error(format!(
                    "could not connect to service '{}': {err}",
                    self.id
                )));
            }
        }
    }

    async fn send_request(&self, ex: &mut Exchange<'_>) {
        if ex.response.is_some() {
            return;
        }
        if ex.access.as_ref().is_some_and(Access::is_refused) {
            debug!(service = %self.id, "access refused, not sending");
            ex.response = Some(
                Response::noaccess(format!(
                    "{} on service '{}' is not allowed for this ident",
                    ex.action.type_, self.id
                ))
                .with_access(ex.access.clone()),
            );
            return;
        }

        let adapter = ex.endpoint.adapter();
        let result = match adapter.send(&ex.request, ex.connection.as_ref()).await {
            Ok(response) => adapter.normalize(response, &ex.request).await,
            Err(err) => Err(err),
        };
        ex.response = Some(match result {
            Ok(response) => {
                debug!(service = %self.id, status = %response.status, "service responded");
                response
            }
            Err(err) => {
                warn!(service = %self.id, error = %err, "send failed");
                Response::error(format!("error from service '{}': {err}", self.id))
            }
        });
    }

    async fn map_response(&self, ex: &mut Exchange<'_>) {
        let Some(response) = ex.response.take_if(|response| response.is_ok()) else {
            return;
        };

        let mut response = match ex.endpoint.mutate_response(response, &ex.request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(service = %self.id, error = %err, "response mutation failed");
                ex.response = Some(Response::error(format!(
                    "could not read response from service '{}': {err}",
                    self.id
                )));
                return;
            }
        };

        if response.is_ok() && is_data_action(&ex.action.type_) && !ex.action.payload.unmapped {
            if let Some(data) = response.data.take() {
                response.data = self.map_from_service(data, ex.action);
            }
        }
        ex.response = Some(response);
    }

    fn authorize_response(&self, ex: &mut Exchange<'_>) -> Response {
        let mut response = ex
            .response
            .take()
            .unwrap_or_else(|| Response::error(format!("no response from service '{}'", self.id)));
        let action = ex.action;
        let ident = action.meta.ident.as_ref();

        if action.payload.unmapped {
            if ident.is_some_and(|ident| ident.root) {
                return response.with_access(Some(Access::granted(ident.cloned())));
            }
            debug!(service = %self.id, "unmapped data refused to non-root ident");
            return Response::noaccess("unmapped data is only available to root")
                .with_access(Some(Access::refused(ident.cloned())));
        }

        if response.access.is_none() {
            response.access = ex.access.clone();
        }
        if !response.is_ok() || !is_data_action(&action.type_) {
            return response;
        }
        let Some(data) = response.data.take() else {
            return response;
        };

        let is_array = data.is_array();
        let items = ensure_array(data);
        if items.is_empty() {
            response.data = reshape(items, is_array);
            return response;
        }

        let authorized = authorize_items(items, ex.access.as_ref(), ident, self.requires_auth(), |item| {
            self.scheme_for(item, &action.type_)
        });
        if let Some(access) = authorized.access {
            response.access = Some(access);
        }
        let items = authorized.data.unwrap_or_default();
        if items.is_empty() {
            debug!(service = %self.id, "no returned item is authorized");
            return Response::noaccess("no items are authorized for this ident").with_access(response.access);
        }
        response.data = reshape(items, is_array);
        response
    }

    fn scheme_for(&self, item: &Value, action_type: &str) -> Option<AccessScheme> {
        item_type(item)
            .and_then(|type_name| self.schemas.get(type_name))
            .map(|schema| schema.access_for_action(action_type))
    }

    /// Casts items back to the plain shape of their type and runs the
    /// type's mapping in reverse. Untyped items pass through.
    fn map_to_service(&self, data: Value) -> Option<Value> {
        let is_array = data.is_array();
        let items = ensure_array(data)
            .into_iter()
            .filter_map(|item| {
                let Some(type_name) = item_type(&item).map(str::to_string) else {
                    return Some(item);
                };
                let item = match self.schemas.get(&type_name) {
                    Some(schema) => schema.cast(&item, CastOptions::reverse())?,
                    None => item,
                };
                match self.mappings.get(&type_name) {
                    Some(mapping) => mapping.reverse(Some(&item)),
                    None => Some(item),
                }
            })
            .collect();
        reshape(items, is_array)
    }

    /// Runs each raw item through the mapping of its type and casts the
    /// result.
    ///
    /// The type is the item's own `$type` when it is one of the candidates,
    /// otherwise the first candidate. Candidates are the requested types, or
    /// every mapped type when none was requested. Items without a type are
    /// dropped.
    fn map_from_service(&self, data: Value, action: &Action) -> Option<Value> {
        let requested = action.payload.types();
        let candidates: Vec<&str> = if requested.is_empty() {
            self.types().collect()
        } else {
            requested
        };
        let opts = if action.payload.only_mapped_values {
            CastOptions::without_defaults()
        } else {
            CastOptions::forward()
        };

        let is_array = data.is_array();
        let mut items = Vec::new();
        for raw in ensure_array(data) {
            let type_name = item_type(&raw)
                .filter(|own| candidates.is_empty() || candidates.contains(own))
                .or_else(|| candidates.first().copied())
                .map(str::to_string);
            let Some(schema) = type_name.as_deref().and_then(|t| self.schemas.get(t)) else {
                continue;
            };
            let mapped = match self.mappings.get(&schema.id) {
                Some(mapping) => mapping.forward(Some(&raw)),
                None => Some(raw),
            };
            match mapped.and_then(|value| schema.cast(&value, opts)) {
                Some(Value::Array(cast)) => items.extend(cast),
                Some(item) => items.push(item),
                None => {}
            }
        }

        if is_array || items.len() != 1 {
            Some(Value::Array(items))
        } else {
            items.pop()
        }
    }
}

/// Puts items back into the shape they came in: an array, or a single item.
fn reshape(items: Vec<Value>, is_array: bool) -> Option<Value> {
    if is_array {
        Some(Value::Array(items))
    } else {
        items.into_iter().next()
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("id", &self.id)
            .field("endpoints", &self.endpoints)
            .field("types", &self.mappings.keys().collect::<Vec<_>>())
            .field("auth", &self.auth.as_ref().map(|auth| auth.id()))
            .finish_non_exhaustive()
    }
}
