//! The adapter interface.
//!
//! An adapter speaks the wire protocol of a service. Conduit ships no
//! concrete adapters; hosts register their own under an id and services
//! refer to them by that id.

use crate::error::AdapterError;
use async_trait::async_trait;
use conduit_types::{Request, Response, Status};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The state an adapter keeps between requests to the same service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub status: Status,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Connection {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            data: Map::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(Status::Ok)
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A service adapter.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Prepares the merged service and endpoint options once, when the
    /// endpoint is built.
    fn prepare_options(&self, options: Value, service_id: &str) -> Value {
        let _ = service_id;
        options
    }

    /// Connects to the service. `connection` is the cached connection from
    /// an earlier request, if any; returning it unchanged reuses it.
    async fn connect(
        &self,
        options: &Value,
        auth: Option<&Value>,
        connection: Option<&Connection>,
    ) -> Result<Connection, AdapterError> {
        let _ = (options, auth);
        Ok(connection.cloned().unwrap_or_else(Connection::ok))
    }

    /// Sends a request to the service.
    async fn send(&self, request: &Request, connection: Option<&Connection>) -> Result<Response, AdapterError>;

    /// Turns a raw service response into the shape mappings expect.
    async fn normalize(&self, response: Response, request: &Request) -> Result<Response, AdapterError> {
        let _ = request;
        Ok(response)
    }

    /// Turns a mapped request into what the service expects on the wire.
    async fn serialize(&self, request: Request) -> Result<Request, AdapterError> {
        Ok(request)
    }

    /// The name of the transport auth scheme this adapter wants from an
    /// authenticator, e.g. `asHttpHeaders`.
    fn authentication_scheme(&self) -> Option<&str> {
        None
    }
}

/// A scriptable adapter for tests.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// An adapter that records what it is asked to do and answers with
    /// scripted results.
    ///
    /// `serialize` and `normalize` append the adapter name to a
    /// `serializedBy` / `normalizedBy` param so chains can be inspected.
    #[derive(Debug, Default)]
    pub struct MockAdapter {
        name: String,
        responses: Mutex<VecDeque<Result<Response, AdapterError>>>,
        connections: Mutex<VecDeque<Result<Connection, AdapterError>>>,
        normalize_error: Option<AdapterError>,
        scheme: Option<String>,
        sent: Mutex<Vec<Request>>,
        connects: AtomicUsize,
    }

    impl MockAdapter {
        pub fn new() -> Self {
            Self::named("mock")
        }

        pub fn named(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                ..Self::default()
            }
        }

        /// Queues a response for the next `send`. Without queued responses
        /// `send` answers `ok` with no data.
        pub fn with_response(self, response: Response) -> Self {
            lock(&self.responses).push_back(Ok(response));
            self
        }

        /// Queues a failure for the next `send`.
        pub fn with_send_error(self, message: impl Into<String>) -> Self {
            lock(&self.responses).push_back(Err(AdapterError::new(message)));
            self
        }

        /// Queues a result for the next `connect`. Without queued results
        /// the cached connection is reused, or a new `ok` one is made.
        pub fn with_connection(self, connection: Result<Connection, AdapterError>) -> Self {
            lock(&self.connections).push_back(connection);
            self
        }

        pub fn with_normalize_error(mut self, message: impl Into<String>) -> Self {
            self.normalize_error = Some(AdapterError::new(message));
            self
        }

        pub fn with_authentication_scheme(mut self, scheme: impl Into<String>) -> Self {
            self.scheme = Some(scheme.into());
            self
        }

        /// Requests passed to `send`, in order.
        pub fn sent_requests(&self) -> Vec<Request> {
            lock(&self.sent).clone()
        }

        pub fn send_count(&self) -> usize {
            lock(&self.sent).len()
        }

        pub fn connect_count(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        fn stamp(&self, params: &mut Map<String, Value>, key: &str) {
            let entry = params.entry(key.to_string()).or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(names) = entry {
                names.push(Value::String(self.name.clone()));
            }
        }
    }

    #[async_trait]
    impl Adapter for MockAdapter {
        async fn connect(
            &self,
            _options: &Value,
            _auth: Option<&Value>,
            connection: Option<&Connection>,
        ) -> Result<Connection, AdapterError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            match lock(&self.connections).pop_front() {
                Some(result) => result,
                None => Ok(connection.cloned().unwrap_or_else(Connection::ok)),
            }
        }

        async fn send(&self, request: &Request, _connection: Option<&Connection>) -> Result<Response, AdapterError> {
            lock(&self.sent).push(request.clone());
            lock(&self.responses)
                .pop_front()
                .unwrap_or_else(|| Ok(Response::ok(None)))
        }

        async fn normalize(&self, mut response: Response, _request: &Request) -> Result<Response, AdapterError> {
            if let Some(err) = &self.normalize_error {
                return Err(err.clone());
            }
            self.stamp(&mut response.params, "normalizedBy");
            Ok(response)
        }

        async fn serialize(&self, mut request: Request) -> Result<Request, AdapterError> {
            self.stamp(&mut request.params, "serializedBy");
            Ok(request)
        }

        fn authentication_scheme(&self) -> Option<&str> {
            self.scheme.as_deref()
        }
    }
}
