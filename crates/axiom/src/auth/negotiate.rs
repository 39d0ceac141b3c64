//! Multi-step login handshake.
//!
//! The portal correlates the steps of a login by cookie, so every request of
//! one negotiation goes through the same cookie jar. A negotiation never
//! retries a step: the login form is not safe to replay blindly.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{Error, StatusError, Step, TokenNotFound};
use crate::scrape::{ScrapedTokens, TokenKind, scrape_tokens};
use crate::types::Portal;

use super::credentials::Credentials;
use super::session::Session;
use super::token::CsrfToken;

/// Form field carrying the csrf token on POSTs.
const AUTHENTICITY_FIELD: &str = "authenticity_token";
const LOGIN_NAME_FIELD: &str = "login_name";
const PASSWORD_FIELD: &str = "password";
const ACCOUNT_FIELD: &str = "account";

/// Default per-request timeout during negotiation and fetches.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Drives the login handshake against one tenant's portal.
///
/// The handshake is:
///
/// 1. GET the login page and scrape its csrf token.
/// 2. POST the credentials with that token.
/// 3. If the response carries an account token, POST it with the refreshed
///    csrf token to the session-confirmation endpoint.
/// 4. The csrf token of the latest response becomes the session token. When
///    that response has none, the landing page is fetched for one.
///
/// # Example
///
/// ```no_run
/// use axiom::{Credentials, Negotiator, Portal, PortalUrl};
///
/// # async fn example() -> Result<(), axiom::Error> {
/// let creds = Credentials::new("alice", "hunter2", "baz");
/// let base = PortalUrl::for_tenant(axiom::DEFAULT_BASE_URL, creds.tenant())?;
/// let session = Negotiator::new(Portal::with_defaults(base))
///     .negotiate(&creds)
///     .await?;
/// let body = session.fetch_resource(1234).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Negotiator {
    portal: Portal,
    timeout: Duration,
}

impl Negotiator {
    /// Create a negotiator for the given portal.
    pub fn new(portal: Portal) -> Self {
        Self {
            portal,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the per-request timeout used by negotiated sessions.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the portal this negotiator logs in to.
    pub fn portal(&self) -> &Portal {
        &self.portal
    }

    /// Run the handshake and produce an authenticated session.
    ///
    /// # Errors
    ///
    /// - [`Error::LoginPage`] if the login page is unreachable, fails, or has
    ///   no csrf token.
    /// - [`Error::HttpStatus`] if a later step receives a non-success status.
    /// - [`Error::TokenNotFound`] if no csrf token can be established.
    #[instrument(skip(self, credentials), fields(portal = %self.portal.base(), username = %credentials.username()))]
    pub async fn negotiate(&self, credentials: &Credentials) -> Result<Session, Error> {
        info!("Negotiating session");

        let jar = Arc::new(Jar::default());
        let http = self.build_client(jar.clone())?;

        let login_token = self
            .login_page(&http)
            .await
            .map_err(|e| Error::LoginPage {
                source: Box::new(e),
            })?;

        let submit_url = self.portal.authenticate_url()?;
        let form = [
            (AUTHENTICITY_FIELD, login_token.as_str()),
            (LOGIN_NAME_FIELD, credentials.username()),
            (PASSWORD_FIELD, credentials.password()),
        ];
        let mut latest = post_form(&http, Step::SubmitCredentials, &submit_url, &form).await?;
        let mut step = Step::SubmitCredentials;

        if let Some(account) = latest.find(TokenKind::Account).map(str::to_string) {
            let csrf = latest.require(TokenKind::Csrf)?.to_string();
            let confirm_url = self.portal.session_url()?;
            let form = [
                (ACCOUNT_FIELD, account.as_str()),
                (AUTHENTICITY_FIELD, csrf.as_str()),
            ];
            latest = post_form(&http, Step::ConfirmSession, &confirm_url, &form).await?;
            step = Step::ConfirmSession;
        }

        if !latest.contains(TokenKind::Csrf) {
            let Some(landing_url) = self.portal.landing_url() else {
                return Err(TokenNotFound {
                    kind: TokenKind::Csrf,
                }
                .into());
            };
            latest = get_page(&http, Step::LandingPage, &landing_url?).await?;
            step = Step::LandingPage;
        }

        let token = CsrfToken::new(latest.require(TokenKind::Csrf)?).ok_or(TokenNotFound {
            kind: TokenKind::Csrf,
        })?;

        debug!(%step, "Session token taken from latest response");
        info!("Session negotiated");

        Ok(Session::new(
            credentials.tenant().to_string(),
            self.portal.clone(),
            http,
            jar,
            token,
        ))
    }

    async fn login_page(&self, http: &reqwest::Client) -> Result<String, Error> {
        let url = self.portal.login_url()?;
        let tokens = get_page(http, Step::LoginPage, &url).await?;
        Ok(tokens.require(TokenKind::Csrf)?.to_string())
    }

    fn build_client(&self, jar: Arc<Jar>) -> Result<reqwest::Client, Error> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("axiom/", env!("CARGO_PKG_VERSION")))
            .cookie_provider(jar)
            .timeout(self.timeout)
            .build()?;
        Ok(client)
    }
}

#[instrument(skip(http, url), fields(url = %url))]
async fn get_page(http: &reqwest::Client, step: Step, url: &Url) -> Result<ScrapedTokens, Error> {
    debug!("GET page");
    let response = http.get(url.clone()).send().await?;
    read_tokens(step, response).await
}

#[instrument(skip(http, url, form), fields(url = %url))]
async fn post_form(
    http: &reqwest::Client,
    step: Step,
    url: &Url,
    form: &[(&str, &str)],
) -> Result<ScrapedTokens, Error> {
    debug!("POST form");
    let response = http.post(url.clone()).form(form).send().await?;
    read_tokens(step, response).await
}

async fn read_tokens(step: Step, response: reqwest::Response) -> Result<ScrapedTokens, Error> {
    let status = response.status();
    if !status.is_success() {
        return Err(StatusError::new(step, status.as_u16(), response.url().as_str()).into());
    }

    let body = response.text().await?;
    let tokens = scrape_tokens(&body);
    debug!(
        %step,
        tokens = tokens.len(),
        csrf = tokens.contains(TokenKind::Csrf),
        account = tokens.contains(TokenKind::Account),
        "Scraped page"
    );
    Ok(tokens)
}
