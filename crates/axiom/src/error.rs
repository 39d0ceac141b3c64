//! Error types for the axiom library.
//!
//! Every failure is returned to the caller as a typed value so that
//! collaborators can tell retryable conditions (transport) apart from
//! recoverable ones (an expired session) and fatal ones (bad status codes,
//! missing tokens).

use std::fmt;
use thiserror::Error;

use crate::scrape::TokenKind;

/// The unified error type for axiom operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A required security token was absent from a served page.
    #[error(transparent)]
    TokenNotFound(#[from] TokenNotFound),

    /// The login page could not be loaded or carried no csrf token.
    #[error("login page unavailable: {source}")]
    LoginPage {
        #[source]
        source: Box<Error>,
    },

    /// A negotiation or fetch step received a non-success status.
    #[error(transparent)]
    HttpStatus(#[from] StatusError),

    /// The portal rejected a request made with a previously valid session.
    #[error("session expired: HTTP {status} from {url}")]
    AuthExpired { status: u16, url: String },

    /// Input validation errors (tenant, URL, endpoint format).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),
}

impl Error {
    /// Returns true for network-level failures a caller may retry with backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::LoginPage { source } => source.is_retryable(),
            _ => false,
        }
    }

    /// Returns true when the session must be re-negotiated before retrying.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Error::AuthExpired { .. })
    }

    /// The step at which an HTTP status failure occurred, if any.
    pub fn step(&self) -> Option<Step> {
        match self {
            Error::HttpStatus(e) => Some(e.step),
            Error::LoginPage { .. } => Some(Step::LoginPage),
            Error::AuthExpired { .. } => Some(Step::FetchResource),
            _ => None,
        }
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    Builder { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_connect() {
            TransportError::Connection {
                message: err.to_string(),
            }
        } else if err.is_builder() {
            TransportError::Builder {
                message: err.to_string(),
            }
        } else {
            TransportError::Http {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(TransportError::from(err))
    }
}

/// A named step of session negotiation or resource retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// GET of the portal login page.
    LoginPage,
    /// POST of username, password and csrf token.
    SubmitCredentials,
    /// POST of the account token to the session-confirmation endpoint.
    ConfirmSession,
    /// GET of the tenant landing page for a fresh token.
    LandingPage,
    /// Authenticated report retrieval.
    FetchResource,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::LoginPage => "login-page",
            Step::SubmitCredentials => "submit-credentials",
            Step::ConfirmSession => "confirm-session",
            Step::LandingPage => "landing-page",
            Step::FetchResource => "fetch-resource",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step received an HTTP status outside the success range.
#[derive(Debug)]
pub struct StatusError {
    /// The step that failed.
    pub step: Step,
    /// HTTP status code.
    pub status: u16,
    /// The URL that produced the status.
    pub url: String,
}

impl StatusError {
    pub fn new(step: Step, status: u16, url: impl Into<String>) -> Self {
        Self {
            step,
            status,
            url: url.into(),
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} during {} ({})", self.status, self.step, self.url)
    }
}

impl std::error::Error for StatusError {}

/// A required token kind was absent from a parsed document.
#[derive(Debug, Error)]
#[error("{kind} token not found")]
pub struct TokenNotFound {
    pub kind: TokenKind,
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid tenant (school) identifier.
    #[error("invalid tenant '{value}': {reason}")]
    Tenant { value: String, reason: String },

    /// Invalid portal base URL.
    #[error("invalid portal URL '{value}': {reason}")]
    PortalUrl { value: String, reason: String },

    /// Invalid endpoint path.
    #[error("invalid endpoint '{value}': {reason}")]
    Endpoint { value: String, reason: String },
}
