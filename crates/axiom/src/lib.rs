//! axiom - Veracross Axiom portal client
//!
//! The portal protects its API behind a session cookie plus a csrf token
//! that must be scraped out of served HTML. This library negotiates that
//! session and attaches the token to every report request.
//!
//! # Example
//!
//! ```no_run
//! use axiom::{AuthenticatedClient, Credentials, Endpoints, Portal};
//!
//! # async fn example() -> Result<(), axiom::Error> {
//! let credentials = Credentials::new("alice", "hunter2", "baz");
//! let portal = Portal::for_tenant(axiom::DEFAULT_BASE_URL, credentials.tenant(), Endpoints::default())?;
//! let client = AuthenticatedClient::connect(portal, credentials).await?;
//!
//! let body = client.fetch_resource(1234).await?;
//! println!("{}", String::from_utf8_lossy(&body));
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod scrape;
pub mod traits;
pub mod types;

// Re-export primary types at crate root for convenience
pub use auth::{Credentials, CsrfToken, Negotiator, Session};
pub use client::AuthenticatedClient;
pub use error::{Error, Step};
pub use scrape::{ScrapedToken, ScrapedTokens, TokenKind, scrape_tokens};
pub use traits::ReportSource;
pub use types::{DEFAULT_BASE_URL, Endpoints, Portal, PortalUrl};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
