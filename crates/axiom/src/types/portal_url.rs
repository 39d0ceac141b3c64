//! Tenant-resolved portal base URL.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::error::{Error, InvalidInputError};

/// Placeholder replaced by the tenant identifier in base URL templates.
pub const TENANT_PLACEHOLDER: &str = "{tenant}";

/// Default base URL template for hosted Axiom portals.
pub const DEFAULT_BASE_URL: &str = "https://axiom.veracross.com/{tenant}/";

/// A validated base URL for one tenant's portal instance.
///
/// The URL always ends in `/`, so relative endpoint paths join underneath
/// the tenant segment rather than replacing it.
///
/// # Example
///
/// ```
/// use axiom::PortalUrl;
///
/// let portal = PortalUrl::for_tenant("https://axiom.veracross.com/{tenant}", "baz").unwrap();
/// assert_eq!(portal.as_str(), "https://axiom.veracross.com/baz/");
/// assert_eq!(portal.join("login").unwrap().as_str(), "https://axiom.veracross.com/baz/login");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortalUrl(Url);

impl PortalUrl {
    /// Create a portal URL from an already tenant-resolved base.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref();
        let mut url = Url::parse(s).map_err(|e| InvalidInputError::PortalUrl {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        url.set_fragment(None);
        url.set_query(None);

        Ok(Self(url))
    }

    /// Resolve a base URL template for a tenant.
    ///
    /// The template's `{tenant}` placeholder is replaced by `tenant`; a
    /// template without the placeholder gets the tenant appended as a path
    /// segment.
    pub fn for_tenant(template: &str, tenant: &str) -> Result<Self, Error> {
        validate_tenant(tenant)?;

        let resolved = if template.contains(TENANT_PLACEHOLDER) {
            template.replace(TENANT_PLACEHOLDER, tenant)
        } else {
            format!("{}/{}/", template.trim_end_matches('/'), tenant)
        };

        Self::new(resolved)
    }

    /// Join a relative endpoint path under this base.
    pub fn join(&self, path: &str) -> Result<Url, Error> {
        if path.starts_with('/') || path.contains("://") {
            return Err(InvalidInputError::Endpoint {
                value: path.to_string(),
                reason: "must be relative to the tenant base".to_string(),
            }
            .into());
        }
        self.0.join(path).map_err(|e| {
            InvalidInputError::Endpoint {
                value: path.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(InvalidInputError::PortalUrl {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        // Must be HTTPS (or HTTP for localhost)
        let scheme = url.scheme();
        let is_localhost = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        if scheme != "https" && !(scheme == "http" && is_localhost) {
            return Err(InvalidInputError::PortalUrl {
                value: original.to_string(),
                reason: "must use HTTPS (HTTP allowed only for localhost)".to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidInputError::PortalUrl {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn validate_tenant(tenant: &str) -> Result<(), Error> {
    let invalid = |reason: &str| -> Error {
        InvalidInputError::Tenant {
            value: tenant.to_string(),
            reason: reason.to_string(),
        }
        .into()
    };

    if tenant.is_empty() {
        return Err(invalid("must not be empty"));
    }
    if tenant == "." || tenant == ".." {
        return Err(invalid("must not be a relative path segment"));
    }
    if !tenant
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(invalid(
            "may only contain ASCII letters, digits, '-', '_' and '.'",
        ));
    }
    Ok(())
}

impl fmt::Display for PortalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PortalUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for PortalUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PortalUrl::new(&s).map_err(serde::de::Error::custom)
    }
}
