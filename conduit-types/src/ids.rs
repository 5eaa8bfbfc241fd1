//! Identifier generation for new items.
//!
//! Uses UUID v4: ids generated here end up in external services that expect
//! opaque, unordered keys.

use uuid::Uuid;

/// Generates a random id for an item that has none.
#[must_use]
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
