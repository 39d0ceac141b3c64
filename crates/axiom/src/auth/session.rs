//! Negotiated portal session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::error::{Error, StatusError, Step};
use crate::types::Portal;

use super::token::CsrfToken;

/// Header carrying the session's csrf token on every API call.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// An authenticated portal session.
///
/// A `Session` is only ever produced by a completed negotiation, so its
/// token is always non-empty and comes from the most recent authenticated
/// page. It is immutable: re-negotiation yields a new `Session` rather than
/// updating this one.
///
/// # Thread Safety
///
/// Sessions are cheap to clone (they use internal `Arc`) and are safe to
/// share read-only across concurrent fetches.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    tenant: String,
    portal: Portal,
    http: reqwest::Client,
    jar: Arc<Jar>,
    token: CsrfToken,
    established_at: DateTime<Utc>,
}

impl Session {
    pub(crate) fn new(
        tenant: String,
        portal: Portal,
        http: reqwest::Client,
        jar: Arc<Jar>,
        token: CsrfToken,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                tenant,
                portal,
                http,
                jar,
                token,
                established_at: Utc::now(),
            }),
        }
    }

    /// Returns the tenant this session belongs to.
    pub fn tenant(&self) -> &str {
        &self.inner.tenant
    }

    /// Returns the portal this session was negotiated against.
    pub fn portal(&self) -> &Portal {
        &self.inner.portal
    }

    /// Returns the csrf token sent as `x-csrf-token`.
    pub fn token(&self) -> &CsrfToken {
        &self.inner.token
    }

    /// When negotiation completed.
    pub fn established_at(&self) -> DateTime<Utc> {
        self.inner.established_at
    }

    /// The `Cookie` header value the session would send to `url`.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.inner
            .jar
            .cookies(url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Fetch the raw body of a report resource.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuthExpired`] when the portal rejects the session
    /// (401/403, or a redirect back to the login page). The session is not
    /// re-negotiated here; that decision belongs to the caller.
    #[instrument(skip(self), fields(tenant = %self.inner.tenant))]
    pub async fn fetch_resource(&self, id: u64) -> Result<Vec<u8>, Error> {
        let url = self.inner.portal.report_url(id)?;
        debug!(%url, "Fetching resource");

        let response = self
            .inner
            .http
            .post(url.clone())
            .header(CSRF_HEADER, self.inner.token.as_str())
            .send()
            .await?;

        let status = response.status();
        trace!(status = %status, "Resource response");

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "Portal rejected session");
            return Err(Error::AuthExpired {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        if !status.is_success() {
            return Err(StatusError::new(Step::FetchResource, status.as_u16(), url.as_str()).into());
        }

        if self.is_login_page(response.url()) {
            warn!(final_url = %response.url(), "Portal redirected to login");
            return Err(Error::AuthExpired {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Resource fetched");
        Ok(body.to_vec())
    }

    fn is_login_page(&self, url: &Url) -> bool {
        self.inner
            .portal
            .login_url()
            .is_ok_and(|login| login.path() == url.path() && login.host() == url.host())
    }
}

// Custom Debug impl that hides sensitive data
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("tenant", &self.inner.tenant)
            .field("portal", &self.inner.portal.base())
            .field("token", &"[REDACTED]")
            .field("established_at", &self.inner.established_at)
            .finish()
    }
}
