//! Authenticated client shared across concurrent report fetches.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::Result;
use crate::auth::{Credentials, Negotiator, Session};
use crate::traits::ReportSource;
use crate::types::Portal;

/// A negotiated session plus what is needed to replace it.
///
/// Fetches read a snapshot of the current [`Session`]; they never mutate it.
/// [`renegotiate`](Self::renegotiate) builds a brand-new session and swaps it
/// in, so in-flight fetches keep using the session they started with.
///
/// The client does not re-negotiate on its own. A fetch rejected by the
/// portal surfaces [`Error::AuthExpired`](crate::Error::AuthExpired) and the
/// caller decides whether to log in again.
pub struct AuthenticatedClient {
    negotiator: Negotiator,
    credentials: Credentials,
    session: RwLock<Arc<Session>>,
    renegotiating: Mutex<()>,
}

impl AuthenticatedClient {
    /// Negotiate a session with the portal and wrap it in a client.
    pub async fn connect(portal: Portal, credentials: Credentials) -> Result<Self> {
        Self::connect_with(Negotiator::new(portal), credentials).await
    }

    /// Like [`connect`](Self::connect) with a preconfigured negotiator.
    pub async fn connect_with(negotiator: Negotiator, credentials: Credentials) -> Result<Self> {
        let session = negotiator.negotiate(&credentials).await?;
        Ok(Self::from_session(negotiator, credentials, session))
    }

    /// Wrap an already negotiated session.
    pub fn from_session(negotiator: Negotiator, credentials: Credentials, session: Session) -> Self {
        Self {
            negotiator,
            credentials,
            session: RwLock::new(Arc::new(session)),
            renegotiating: Mutex::new(()),
        }
    }

    /// Returns a snapshot of the current session.
    pub async fn session(&self) -> Arc<Session> {
        self.session.read().await.clone()
    }

    /// Returns the portal this client talks to.
    pub fn portal(&self) -> &Portal {
        self.negotiator.portal()
    }

    /// Fetch the raw body of a report resource with the current session.
    pub async fn fetch_resource(&self, id: u64) -> Result<Vec<u8>> {
        let session = self.session().await;
        session.fetch_resource(id).await
    }

    /// Negotiate a new session and atomically replace the current one.
    ///
    /// Concurrent calls are serialized; each performs its own negotiation.
    /// On failure the current session is left in place.
    #[instrument(skip(self), fields(tenant = %self.credentials.tenant()))]
    pub async fn renegotiate(&self) -> Result<()> {
        let _guard = self.renegotiating.lock().await;
        self.swap_in_fresh_session().await
    }

    /// Replace `expired` with a newly negotiated session, unless another
    /// caller has already replaced it.
    ///
    /// `expired` is the snapshot whose fetch was rejected. Callers that raced
    /// on the same expired session share a single login. Returns whether this
    /// call negotiated.
    #[instrument(skip(self, expired), fields(tenant = %self.credentials.tenant()))]
    pub async fn replace_expired(&self, expired: &Arc<Session>) -> Result<bool> {
        let _guard = self.renegotiating.lock().await;
        if !Arc::ptr_eq(&*self.session.read().await, expired) {
            debug!("Session already replaced");
            return Ok(false);
        }
        self.swap_in_fresh_session().await?;
        Ok(true)
    }

    async fn swap_in_fresh_session(&self) -> Result<()> {
        info!("Re-negotiating session");

        let fresh = Arc::new(self.negotiator.negotiate(&self.credentials).await?);
        *self.session.write().await = fresh;

        info!("Session replaced");
        Ok(())
    }
}

#[async_trait]
impl ReportSource for AuthenticatedClient {
    async fn fetch_report(&self, id: u64) -> Result<Vec<u8>> {
        self.fetch_resource(id).await
    }

    async fn renegotiate(&self) -> Result<()> {
        AuthenticatedClient::renegotiate(self).await
    }
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("portal", &self.negotiator.portal().base())
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
