//! Access scheme evaluation.
//!
//! Schemas declare who may do what with an [`AccessDef`]. Before a request is
//! sent, [`authorize_request`] decides whether the ident may perform the
//! action at all; after a response comes back, [`authorize_items`] filters the
//! returned items one by one.
//!
//! Two-phase by construction: schemes that depend on item fields
//! (`roleFromField`, `identFromField`) are granted to any ident at request
//! level and checked precisely at item level.

mod authorize;
mod scheme;

pub use authorize::{
    authorize_items, authorize_request, authorize_scheme, is_item_authorized, AuthorizedItems,
    RequestAuthorization,
};
pub use scheme::{access_for_action, AccessDef, AccessScheme, Allow, SchemeDef};
