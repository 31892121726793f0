//! Visitor identity provisioning.
//!
//! The endpoint tracks conversations by an opaque visitor identifier.
//! The identifier carries no authentication semantics, it only has to
//! be stable for as long as the visitor should be recognized.

use std::env;

use uuid::Uuid;

/// Environment variable that pins the visitor identifier.
pub const VISITOR_ID_ENV: &str = "CHATLINE_VISITOR_ID";

/// Provisions a visitor identifier for this process.
///
/// Honors [`VISITOR_ID_ENV`] when set (and non-empty), otherwise mints
/// a fresh random identifier. Persistence across runs is up to the
/// caller.
pub fn provision_visitor_id() -> String {
    match env::var(VISITOR_ID_ENV) {
        Ok(id) if !id.is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    }
}
