//! Portal endpoint layout.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, InvalidInputError};

use super::portal_url::PortalUrl;

/// Placeholder replaced by the resource id in the report path template.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Paths of the endpoints involved in login and report retrieval, relative
/// to the tenant base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Login page; also the credential target when `authenticate` is unset.
    pub login: String,
    /// Dedicated credential submission endpoint.
    pub authenticate: Option<String>,
    /// Session confirmation endpoint, used when an account token is served.
    pub session: String,
    /// Page fetched for a fresh token when the last POST response had none.
    pub landing: Option<String>,
    /// Report data path; `{id}` is replaced by the resource id.
    pub report: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "login".to_string(),
            authenticate: None,
            session: "session".to_string(),
            landing: Some(String::new()),
            report: "query/{id}/result_data.json".to_string(),
        }
    }
}

/// A tenant's portal: base URL plus endpoint layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
    base: PortalUrl,
    endpoints: Endpoints,
}

impl Portal {
    /// Create a portal, checking that the report template names the id.
    pub fn new(base: PortalUrl, endpoints: Endpoints) -> Result<Self, Error> {
        if !endpoints.report.contains(ID_PLACEHOLDER) {
            return Err(InvalidInputError::Endpoint {
                value: endpoints.report.clone(),
                reason: format!("report path must contain {}", ID_PLACEHOLDER),
            }
            .into());
        }
        Ok(Self { base, endpoints })
    }

    /// Resolve `template` for `tenant` and attach the endpoint layout.
    pub fn for_tenant(template: &str, tenant: &str, endpoints: Endpoints) -> Result<Self, Error> {
        Self::new(PortalUrl::for_tenant(template, tenant)?, endpoints)
    }

    /// Portal with the default endpoint layout.
    pub fn with_defaults(base: PortalUrl) -> Self {
        Self {
            base,
            endpoints: Endpoints::default(),
        }
    }

    pub fn base(&self) -> &PortalUrl {
        &self.base
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn login_url(&self) -> Result<Url, Error> {
        self.base.join(&self.endpoints.login)
    }

    /// Where credentials are posted.
    pub fn authenticate_url(&self) -> Result<Url, Error> {
        match &self.endpoints.authenticate {
            Some(path) => self.base.join(path),
            None => self.login_url(),
        }
    }

    pub fn session_url(&self) -> Result<Url, Error> {
        self.base.join(&self.endpoints.session)
    }

    pub fn landing_url(&self) -> Option<Result<Url, Error>> {
        self.endpoints
            .landing
            .as_deref()
            .map(|path| self.base.join(path))
    }

    pub fn report_url(&self, id: u64) -> Result<Url, Error> {
        let path = self
            .endpoints
            .report
            .replace(ID_PLACEHOLDER, &id.to_string());
        self.base.join(&path)
    }
}
