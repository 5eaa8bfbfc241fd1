use crate::adapter::Adapter;
use crate::definition::{EndpointDef, MatchObject};
use crate::error::{AdapterError, EndpointError, EndpointResult};
use crate::filter::Filter;
use crate::specificity::Specificity;
use conduit_mapping::{merge, Mapping, Mappings};
use conduit_types::{Action, Request, Response, Status};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// What an endpoint needs from its service when it is built.
pub struct EndpointContext<'a> {
    pub service_id: &'a str,
    pub service_options: &'a Value,
    pub adapter: Arc<dyn Adapter>,
    /// All registered adapters, for resolving extra adapter ids.
    pub adapters: &'a HashMap<String, Arc<dyn Adapter>>,
    pub mappings: &'a Mappings,
}

/// A route to one service operation.
pub struct Endpoint {
    id: Option<String>,
    match_: MatchObject,
    filters: Vec<Filter>,
    options: Value,
    mutation: Option<Mapping>,
    adapter: Arc<dyn Adapter>,
    extra_adapters: Vec<Arc<dyn Adapter>>,
}

impl Endpoint {
    pub fn new(def: EndpointDef, ctx: &EndpointContext<'_>) -> EndpointResult<Self> {
        let filters = def
            .match_
            .filters
            .iter()
            .map(|(path, schema)| Filter::compile(path, schema))
            .collect::<EndpointResult<Vec<_>>>()?;

        let extra_adapters = def
            .adapters
            .iter()
            .map(|id| {
                ctx.adapters
                    .get(id)
                    .cloned()
                    .ok_or_else(|| EndpointError::UnknownAdapter(id.clone()))
            })
            .collect::<EndpointResult<Vec<_>>>()?;

        let mutation = def
            .mutation
            .as_ref()
            .map(|mutation| ctx.mappings.compile(mutation))
            .transpose()?;

        let mut options = match ctx.service_options {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };
        if !def.options.is_null() {
            merge(&mut options, def.options);
        }
        let options = ctx.adapter.prepare_options(options, ctx.service_id);

        debug!(
            service = ctx.service_id,
            endpoint = def.id.as_deref().unwrap_or("-"),
            filters = filters.len(),
            extra_adapters = extra_adapters.len(),
            "endpoint ready"
        );
        Ok(Self {
            id: def.id,
            match_: def.match_,
            filters,
            options,
            mutation,
            adapter: Arc::clone(&ctx.adapter),
            extra_adapters,
        })
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Service options merged with the endpoint options, as prepared by the
    /// adapter.
    pub fn options(&self) -> &Value {
        &self.options
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter> {
        &self.adapter
    }

    /// Tests whether this endpoint serves the action.
    pub fn is_match(&self, action: &Action) -> bool {
        let payload = &action.payload;
        let m = &self.match_;

        if let Some(pinned) = &payload.endpoint {
            if self.id.as_deref() != Some(pinned.as_str()) {
                return false;
            }
        }
        if let Some(types) = &m.type_ {
            if !payload.types().iter().any(|t| types.contains(&t.to_string())) {
                return false;
            }
        }
        if let Some(scopes) = &m.scope {
            if !scopes.contains(&payload.scope()) {
                return false;
            }
        }
        if let Some(actions) = &m.action {
            if !actions.contains(&action.type_) {
                return false;
            }
        }
        if !m
            .params
            .iter()
            .filter(|(_, required)| **required)
            .all(|(key, _)| payload.get(key).is_some())
        {
            return false;
        }
        if !self.filters.is_empty() {
            let Ok(value) = serde_json::to_value(action) else {
                return false;
            };
            return self.filters.iter().all(|filter| filter.is_match(&value));
        }
        true
    }

    /// Shapes a request for the service: the mutation runs in reverse over
    /// `{data, params}`, then extra adapters serialize last to first, then
    /// the service adapter serializes.
    pub async fn mutate_request(&self, mut request: Request) -> Result<Request, AdapterError> {
        if let Some(mutation) = &self.mutation {
            let mut envelope = Map::new();
            if let Some(data) = &request.data {
                envelope.insert("data".into(), data.clone());
            }
            envelope.insert("params".into(), Value::Object(request.params.clone()));

            let mut mutated = match mutation.reverse(Some(&Value::Object(envelope))) {
                Some(Value::Object(mutated)) => mutated,
                _ => Map::new(),
            };
            if let Some(data) = mutated.remove("data") {
                request.data = Some(data).filter(|data| !data.is_null());
            }
            if let Some(Value::Object(params)) = mutated.remove("params") {
                request.params = params;
            }
        }

        for adapter in self.extra_adapters.iter().rev() {
            request = adapter.serialize(request).await.inspect_err(|err| {
                warn!(endpoint = self.id.as_deref().unwrap_or("-"), error = %err, "extra adapter could not serialize request");
            })?;
        }
        self.adapter.serialize(request).await.inspect_err(|err| {
            warn!(endpoint = self.id.as_deref().unwrap_or("-"), error = %err, "could not serialize request");
        })
    }

    /// Shapes a service response for the per-type mappings: extra adapters
    /// normalize first to last, then the mutation runs forward over
    /// `{status, data, error, paging, params}`. Keys the mutation does not
    /// produce keep their values.
    pub async fn mutate_response(&self, mut response: Response, request: &Request) -> Result<Response, AdapterError> {
        for adapter in &self.extra_adapters {
            response = adapter.normalize(response, request).await.inspect_err(|err| {
                warn!(endpoint = self.id.as_deref().unwrap_or("-"), error = %err, "extra adapter could not normalize response");
            })?;
        }

        let Some(mutation) = &self.mutation else {
            return Ok(response);
        };

        let mut envelope = Map::new();
        envelope.insert("status".into(), Value::String(response.status.as_str().into()));
        if let Some(data) = response.data.take() {
            envelope.insert("data".into(), data);
        }
        if let Some(error) = &response.error {
            envelope.insert("error".into(), Value::String(error.clone()));
        }
        if let Some(paging) = &response.paging {
            envelope.insert("paging".into(), paging.clone());
        }
        envelope.insert("params".into(), Value::Object(response.params.clone()));
        let original = envelope.clone();

        let mut mutated = match mutation.forward(Some(&Value::Object(envelope))) {
            Some(Value::Object(mutated)) => mutated,
            _ => Map::new(),
        };
        let mut take = |key: &str| mutated.remove(key).or_else(|| original.get(key).cloned());

        if let Some(status) = take("status") {
            response.status = serde_json::from_value::<Status>(status).inspect_err(|err| {
                warn!(endpoint = self.id.as_deref().unwrap_or("-"), error = %err, "mutation produced an unknown status");
            })?;
        }
        response.data = take("data").filter(|data| !data.is_null());
        response.error = take("error").and_then(|error| match error {
            Value::String(error) => Some(error),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        response.paging = take("paging").filter(|paging| !paging.is_null());
        if let Some(Value::Object(params)) = take("params") {
            response.params = params;
        }
        Ok(response)
    }
}

impl Specificity for Endpoint {
    fn endpoint_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn match_object(&self) -> &MatchObject {
        &self.match_
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("id", &self.id)
            .field("match", &self.match_)
            .field("options", &self.options)
            .field("mutation", &self.mutation.is_some())
            .field("extra_adapters", &self.extra_adapters.len())
            .finish()
    }
}

/// Picks the first matching endpoint from a list sorted by
/// [`sort_endpoints`](crate::sort_endpoints).
pub fn select_endpoint<'a>(endpoints: &'a [Endpoint], action: &Action) -> Option<&'a Endpoint> {
    endpoints.iter().find(|endpoint| endpoint.is_match(action))
}
