//! TOML configuration.
//!
//! ```toml
//! interval = "1h"
//! veracross_username = "alice"
//! veracross_password = "hunter2"
//! veracross_school = "baz"
//! reports_path = "/var/lib/vquery"
//!
//! [[reports]]
//! name = "students"
//! id = 1234
//! format = "csv"
//! keys = ["person_pk", "first_name", "household.address"]
//! print_header = true
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use axiom::{Credentials, Endpoints, Portal};

use crate::duration;

/// Environment variables that override credential fields of the file.
pub const ENV_USERNAME: &str = "VERACROSS_USERNAME";
pub const ENV_PASSWORD: &str = "VERACROSS_PASSWORD";
pub const ENV_SCHOOL: &str = "VERACROSS_SCHOOL";

#[derive(Deserialize)]
pub struct Config {
    /// Time between scheduled runs.
    #[serde(default = "default_interval", deserialize_with = "duration::deserialize")]
    pub interval: Duration,

    #[serde(default)]
    pub veracross_username: String,

    #[serde(default)]
    pub veracross_password: String,

    #[serde(default)]
    pub veracross_school: String,

    /// Directory reports are saved into.
    #[serde(default = "default_reports_path")]
    pub reports_path: PathBuf,

    /// Deadline for a single request, including a whole report fetch.
    #[serde(default = "default_timeout", deserialize_with = "duration::deserialize")]
    pub timeout: Duration,

    #[serde(default)]
    pub portal: PortalConfig,

    #[serde(default)]
    pub reports: Vec<ReportSpec>,
}

/// Portal addressing overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Base URL template; `{tenant}` is replaced by the school.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(flatten)]
    pub endpoints: Endpoints,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Output format of a saved report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// The portal's JSON body, verbatim
    #[default]
    Json,
    /// Selected keys flattened into CSV rows
    Csv,
}

/// One configured report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportSpec {
    pub name: String,
    pub id: u64,
    #[serde(default)]
    pub format: Format,
    /// Dotted key paths selecting CSV columns.
    #[serde(default, deserialize_with = "deserialize_keys")]
    pub keys: Vec<String>,
    #[serde(default)]
    pub print_header: bool,
}

impl ReportSpec {
    /// File name the report is saved under.
    pub fn file_name(&self) -> String {
        match self.format {
            Format::Json => format!("{}.json", self.name),
            Format::Csv => format!("{}.csv", self.name),
        }
    }
}

impl Config {
    /// Read, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).context("Failed to read config file")?;
        let mut config = Self::from_toml(&text)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse without environment overrides or validation.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid config")
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides = [
            (ENV_USERNAME, &mut self.veracross_username),
            (ENV_PASSWORD, &mut self.veracross_password),
            (ENV_SCHOOL, &mut self.veracross_school),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.veracross_username.is_empty() {
            bail!("veracross_username is required (or set {ENV_USERNAME})");
        }
        if self.veracross_password.is_empty() {
            bail!("veracross_password is required (or set {ENV_PASSWORD})");
        }
        if self.veracross_school.is_empty() {
            bail!("veracross_school is required (or set {ENV_SCHOOL})");
        }
        if self.timeout.is_zero() {
            bail!("timeout must be greater than zero");
        }

        let mut names = HashSet::new();
        for report in &self.reports {
            if report.name.is_empty() {
                bail!("report {} has an empty name", report.id);
            }
            if report.name.contains(['/', '\\']) {
                bail!("report name '{}' must not contain path separators", report.name);
            }
            if !names.insert(report.name.as_str()) {
                bail!("report name '{}' is used more than once", report.name);
            }
            if report.format == Format::Csv && report.keys.is_empty() {
                bail!("report '{}' must specify keys for csv output", report.name);
            }
        }

        // Resolve once so bad tenants or templates fail at startup
        self.portal()?;
        Ok(())
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            &self.veracross_username,
            &self.veracross_password,
            &self.veracross_school,
        )
    }

    pub fn portal(&self) -> Result<Portal> {
        Portal::for_tenant(
            &self.portal.base_url,
            &self.veracross_school,
            self.portal.endpoints.clone(),
        )
        .context("Invalid portal configuration")
    }
}

// Intentionally hide password in Debug output
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("interval", &self.interval)
            .field("veracross_username", &self.veracross_username)
            .field("veracross_password", &"[REDACTED]")
            .field("veracross_school", &self.veracross_school)
            .field("reports_path", &self.reports_path)
            .field("timeout", &self.timeout)
            .field("portal", &self.portal)
            .field("reports", &self.reports)
            .finish()
    }
}

fn default_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

fn default_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_reports_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_base_url() -> String {
    axiom::DEFAULT_BASE_URL.to_string()
}

/// Keys may be an array or a single comma-separated string.
fn deserialize_keys<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum KeyList {
        Joined(String),
        List(Vec<String>),
    }

    let keys = match KeyList::deserialize(deserializer)? {
        KeyList::Joined(s) => split_keys(&s),
        KeyList::List(list) => list.iter().flat_map(|s| split_keys(s)).collect(),
    };
    Ok(keys)
}

/// Split a comma-separated key list, dropping blanks.
pub fn split_keys(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
