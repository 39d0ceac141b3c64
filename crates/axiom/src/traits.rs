//! Seam between report consumers and the authenticated client.

use async_trait::async_trait;

use crate::Result;

/// Something that can fetch report bodies and recover an expired session.
///
/// Implemented by [`AuthenticatedClient`](crate::AuthenticatedClient); report
/// runners depend on this trait rather than on the concrete client.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Fetch the raw body of one report.
    async fn fetch_report(&self, id: u64) -> Result<Vec<u8>>;

    /// Replace the current session with a freshly negotiated one.
    async fn renegotiate(&self) -> Result<()>;
}
