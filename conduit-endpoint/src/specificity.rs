//! Ordering endpoints from most to least specific.
//!
//! Endpoints are sorted once, when a service is built, and then tried in
//! order; the first match wins. Criteria, in priority order:
//!
//! 1. has a `type` before none
//! 2. a single `type` before a list
//! 3. more required params before fewer
//! 4. more optional params before fewer
//! 5. more filters before fewer
//! 6. has a `scope` before none
//! 7. a single `scope` before a list
//! 8. has an `action` before none
//! 9. a single `action` before a list
//! 10. has an `id` before none
//!
//! The sort is stable, so equally specific endpoints keep their declared
//! order.

use crate::definition::{EndpointDef, MatchObject};
use conduit_types::OneOrMany;
use std::cmp::{Ordering, Reverse};

/// Anything that can be ranked by specificity.
pub trait Specificity {
    fn endpoint_id(&self) -> Option<&str>;
    fn match_object(&self) -> &MatchObject;
}

impl Specificity for EndpointDef {
    fn endpoint_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn match_object(&self) -> &MatchObject {
        &self.match_
    }
}

type SpecificityKey = (
    bool,
    bool,
    Reverse<usize>,
    Reverse<usize>,
    Reverse<usize>,
    bool,
    bool,
    bool,
    bool,
    bool,
);

fn is_many<T>(value: &Option<OneOrMany<T>>) -> bool {
    value.as_ref().is_some_and(OneOrMany::is_many)
}

fn specificity_key<T: Specificity + ?Sized>(endpoint: &T) -> SpecificityKey {
    let m = endpoint.match_object();
    (
        m.type_.is_none(),
        is_many(&m.type_),
        Reverse(m.required_params()),
        Reverse(m.optional_params()),
        Reverse(m.filters.len()),
        m.scope.is_none(),
        is_many(&m.scope),
        m.action.is_none(),
        is_many(&m.action),
        endpoint.endpoint_id().is_none(),
    )
}

/// Compares two endpoints; `Less` means `a` is more specific.
pub fn compare_specificity<T: Specificity + ?Sized>(a: &T, b: &T) -> Ordering {
    specificity_key(a).cmp(&specificity_key(b))
}

/// Sorts endpoints, most specific first.
pub fn sort_endpoints<T: Specificity>(endpoints: &mut [T]) {
    endpoints.sort_by_cached_key(|endpoint| specificity_key(endpoint));
}
