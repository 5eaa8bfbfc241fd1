//! Authentication of services.
//!
//! An [`Authenticator`] knows how to obtain credentials for a service, e.g.
//! an OAuth token or an API key. Conduit ships no concrete authenticators;
//! hosts register their own. An [`Auth`] pairs an authenticator with the
//! options of one auth definition and caches the last authentication, so
//! every service sharing the auth reuses it until it is no longer valid.

use crate::config::AuthDef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Outcome of an authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Granted,
    Refused,
    Error,
    Timeout,
}

/// Credentials obtained by an authenticator, or the reason there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Authentication {
    pub status: AuthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Authenticator-specific credentials, e.g. `token` and `expire`.
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Authentication {
    pub fn new(status: AuthStatus) -> Self {
        Self {
            status,
            error: None,
            data: Map::new(),
        }
    }

    pub fn granted() -> Self {
        Self::new(AuthStatus::Granted)
    }

    pub fn refused(error: impl Into<String>) -> Self {
        Self::failed(AuthStatus::Refused, error)
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::failed(AuthStatus::Error, error)
    }

    pub fn timeout(error: impl Into<String>) -> Self {
        Self::failed(AuthStatus::Timeout, error)
    }

    fn failed(status: AuthStatus, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(status)
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn is_granted(&self) -> bool {
        self.status == AuthStatus::Granted
    }
}

/// Obtains credentials for a service.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Authenticates with the options of the auth definition. Failures are
    /// reported through the returned status.
    async fn authenticate(&self, options: &Value) -> Authentication;

    /// Whether a cached authentication may still be used.
    fn is_authenticated(&self, authentication: &Authentication) -> bool {
        authentication.is_granted()
    }

    /// Derives the transport auth an adapter asked for by scheme name, e.g.
    /// `asHttpHeaders`. `None` when the scheme is not supported.
    fn as_scheme(&self, scheme: &str, authentication: &Authentication) -> Option<Value> {
        let _ = (scheme, authentication);
        None
    }
}

/// An authenticator bound to the options of one auth definition, with a
/// single cached authentication.
///
/// The cache is best effort: concurrent callers that find it empty each
/// authenticate, and the last result wins.
pub struct Auth {
    id: String,
    authenticator: Arc<dyn Authenticator>,
    options: Value,
    cached: RwLock<Option<Authentication>>,
}

impl Auth {
    pub fn new(def: AuthDef, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            id: def.id,
            authenticator,
            options: def.options,
            cached: RwLock::new(None),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the cached authentication while the authenticator accepts
    /// it, or authenticates anew. A timeout is retried once.
    pub async fn authenticate(&self) -> Authentication {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if self.authenticator.is_authenticated(cached) {
                debug!(auth = %self.id, "reusing authentication");
                return cached.clone();
            }
        }

        let mut authentication = self.authenticator.authenticate(&self.options).await;
        if authentication.status == AuthStatus::Timeout {
            warn!(auth = %self.id, "authentication timed out, retrying");
            authentication = self.authenticator.authenticate(&self.options).await;
        }
        debug!(auth = %self.id, status = ?authentication.status, "authenticated");

        *self.cached.write().await = authentication.is_granted().then(|| authentication.clone());
        authentication
    }

    /// Derives transport auth from an authentication.
    pub fn as_scheme(&self, scheme: &str, authentication: &Authentication) -> Option<Value> {
        self.authenticator.as_scheme(scheme, authentication)
    }

    /// Forgets the cached authentication.
    pub async fn clear(&self) {
        *self.cached.write().await = None;
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("id", &self.id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A scriptable authenticator for tests.
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// An authenticator that answers with scripted authentications.
    ///
    /// Without scripted results it grants with `token: "t0k3n"`. It
    /// supports the `asHttpHeaders` scheme, turning a token into an
    /// `Authorization` header.
    #[derive(Debug, Default)]
    pub struct MockAuthenticator {
        results: Mutex<VecDeque<Authentication>>,
        single_use: bool,
        calls: AtomicUsize,
    }

    impl MockAuthenticator {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queues the result of the next `authenticate`.
        pub fn with_result(self, authentication: Authentication) -> Self {
            self.results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push_back(authentication);
            self
        }

        /// Treats every authentication as expired, so each request
        /// authenticates again.
        pub fn single_use(mut self) -> Self {
            self.single_use = true;
            self
        }

        /// Number of `authenticate` calls so far.
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for MockAuthenticator {
        async fn authenticate(&self, _options: &Value) -> Authentication {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Authentication::granted().with("token", Value::from("t0k3n")))
        }

        fn is_authenticated(&self, authentication: &Authentication) -> bool {
            !self.single_use && authentication.is_granted()
        }

        fn as_scheme(&self, scheme: &str, authentication: &Authentication) -> Option<Value> {
            let token = authentication.data.get("token")?.as_str()?;
            match scheme {
                "asHttpHeaders" => Some(serde_json::json!({ "Authorization": format!("Bearer {token}") })),
                _ => None,
            }
        }
    }
}
