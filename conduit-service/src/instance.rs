//! The instance: every service built from one set of definitions, and the
//! dispatcher that routes actions to them.

use crate::auth::Auth;
use crate::config::{Defs, Resources};
use crate::error::{SetupError, SetupResult};
use crate::service::{Service, ServiceContext};
use conduit_mapping::Mappings;
use conduit_schema::Schemas;
use conduit_types::{Action, OneOrMany, Response, Scope, Status};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A running set of services.
#[derive(Debug)]
pub struct Instance {
    schemas: Arc<Schemas>,
    services: HashMap<String, Service>,
}

impl Instance {
    /// Builds every schema, mapping, auth and service. Ids in the
    /// definitions are resolved against `resources` here, once.
    pub fn new(defs: Defs, resources: Resources) -> SetupResult<Self> {
        let schemas = Schemas::new(defs.schemas)?;
        let mappings = Mappings::new(defs.mappings, resources.transformers)?;

        let mut auths = HashMap::new();
        for def in defs.auths {
            let authenticator = resources
                .authenticators
                .get(&def.authenticator)
                .cloned()
                .ok_or_else(|| SetupError::UnknownAuthenticator {
                    auth: def.id.clone(),
                    authenticator: def.authenticator.clone(),
                })?;
            if auths.contains_key(&def.id) {
                return Err(SetupError::DuplicateAuth(def.id));
            }
            auths.insert(def.id.clone(), Arc::new(Auth::new(def, authenticator)));
        }

        let ctx = ServiceContext {
            schemas: &schemas,
            mappings: &mappings,
            adapters: &resources.adapters,
            auths: &auths,
        };
        let mut services = HashMap::new();
        for def in defs.services {
            if services.contains_key(&def.id) {
                return Err(SetupError::DuplicateService(def.id));
            }
            let service = Service::new(def, &ctx)?;
            services.insert(service.id().to_string(), service);
        }

        info!(
            schemas = schemas.len(),
            services = services.len(),
            auths = auths.len(),
            "instance ready"
        );
        Ok(Self { schemas, services })
    }

    pub fn schemas(&self) -> &Arc<Schemas> {
        &self.schemas
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.get(id)
    }

    /// Dispatches an action to its service. Failures are reported in the
    /// response status.
    pub async fn dispatch(&self, action: Action) -> Response {
        let service = match self.service_for(&action) {
            Ok(service) => service,
            Err(message) => {
                debug!(action = %action.type_, %message, "could not route action");
                return Response::error(message);
            }
        };
        debug!(action = %action.type_, service = service.id(), "dispatching action");

        match action.type_.as_str() {
            "GET" => get(service, &action).await,
            "SET" => set(service, &action).await,
            "DELETE" => delete(service, action).await,
            _ => service.send(&action).await,
        }
    }

    /// The service named in the payload, or the service of the requested
    /// type's schema.
    fn service_for(&self, action: &Action) -> Result<&Service, String> {
        let id = match &action.payload.service {
            Some(id) => id.as_str(),
            None => {
                let type_name = action.payload.types().first().copied();
                type_name
                    .and_then(|t| self.schemas.get(t))
                    .and_then(|schema| schema.service.as_deref())
                    .ok_or_else(|| match type_name {
                        Some(t) => format!("no service for type '{t}'"),
                        None => "no service or type given".to_string(),
                    })?
            }
        };
        self.services
            .get(id)
            .ok_or_else(|| format!("unknown service '{id}'"))
    }
}

/// Gets items. A member request answers with the item itself, or
/// `notfound` when the service returned nothing.
async fn get(service: &Service, action: &Action) -> Response {
    let mut response = service.send(action).await;
    if !response.is_ok() || action.payload.scope() != Scope::Member {
        return response;
    }

    response.data = match response.data.take() {
        Some(Value::Array(mut items)) if items.len() == 1 => items.pop(),
        Some(Value::Array(items)) if items.is_empty() => None,
        other => other,
    };
    if response.data.is_none() {
        let id = action.payload.id.as_ref().and_then(OneOrMany::first).map_or("", String::as_str);
        return Response::failure(Status::NotFound, format!("could not find item with id '{id}'"))
            .with_access(response.access);
    }
    response
}

/// Sets items. When the service answers without data, the response carries
/// the data that was authorized for writing.
async fn set(service: &Service, action: &Action) -> Response {
    if action.payload.data.is_none() {
        return Response::failure(Status::NoAction, "no data to SET");
    }
    let outcome = service.exchange(action).await;
    let mut response = outcome.response;
    if response.is_ok() && response.data.is_none() {
        response.data = outcome.authorized_data;
    }
    response
}

/// Deletes items. Without data, the items are built from the payload id and
/// type.
async fn delete(service: &Service, mut action: Action) -> Response {
    if action.payload.data.is_none() {
        let types = action.payload.types();
        let ids = action.payload.id.as_ref().map(OneOrMany::as_vec).unwrap_or_default();
        if ids.is_empty() || types.len() != 1 {
            return Response::failure(Status::NoAction, "no items to DELETE");
        }
        let items: Vec<Value> = ids
            .into_iter()
            .map(|id| json!({ "id": id, "$type": types[0] }))
            .collect();
        action.payload.data = Some(Value::Array(items));
    }
    service.send(&action).await
}
