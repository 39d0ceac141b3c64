//! Portal addressing types.
//!
//! These types validate tenant identifiers and URLs at construction time,
//! so negotiation never starts against a malformed address.

mod endpoints;
mod portal_url;

pub use endpoints::{Endpoints, ID_PLACEHOLDER, Portal};
pub use portal_url::{DEFAULT_BASE_URL, PortalUrl, TENANT_PLACEHOLDER};
