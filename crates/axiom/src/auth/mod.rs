//! Session negotiation and the authenticated session it produces.
//!
//! All authenticated portal calls require a [`Session`], which is only
//! obtainable through [`Negotiator::negotiate`].

mod credentials;
mod negotiate;
mod session;
mod token;

pub use credentials::Credentials;
pub use negotiate::{DEFAULT_TIMEOUT, Negotiator};
pub use session::{CSRF_HEADER, Session};
pub use token::CsrfToken;
