//! Login credentials type.

use std::fmt;

/// Login credentials for a tenant's portal.
///
/// # Security
///
/// The password is never exposed in Debug output to prevent accidental logging.
///
/// # Example
///
/// ```
/// use axiom::Credentials;
///
/// let creds = Credentials::new("alice", "hunter2", "baz");
/// assert_eq!(creds.username(), "alice");
/// assert_eq!(creds.tenant(), "baz");
/// ```
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    tenant: String,
}

impl Credentials {
    /// Create new credentials.
    ///
    /// # Arguments
    ///
    /// * `username` - The portal login name
    /// * `password` - The portal password
    /// * `tenant` - The school identifier in the portal URL
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        tenant: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            tenant: tenant.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Use only when constructing the login form. Never log this value.
    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("tenant", &self.tenant)
            .finish()
    }
}
