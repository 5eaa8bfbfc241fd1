//! Endpoints and the adapter interface.
//!
//! A service declares endpoints; each endpoint says which actions it serves
//! (its [`MatchObject`]) and how requests and responses are reshaped on the
//! way to and from the service [`Adapter`]. Endpoints are ranked by
//! [`compare_specificity`] and the first match wins.

pub mod adapter;
mod definition;
mod endpoint;
mod error;
mod filter;
mod specificity;

pub use adapter::{Adapter, Connection};
pub use definition::{EndpointDef, MatchObject};
pub use endpoint::{select_endpoint, Endpoint, EndpointContext};
pub use error::{AdapterError, EndpointError, EndpointResult};
pub use filter::Filter;
pub use specificity::{compare_specificity, sort_endpoints, Specificity};
