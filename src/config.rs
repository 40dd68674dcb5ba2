//! Configuration for the version gate and the Snyk API walk

use crate::error::{GateError, Result};
use crate::version::parse_version;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the Snyk API token
pub const TOKEN_ENV_VAR: &str = "SNYK_API_TOKEN";

/// Main configuration shared by the local gate and the remote reporter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Which package to check and the highest version it may resolve to
    pub gate: GateConfig,
    /// Snyk API settings used by the remote reporter
    pub snyk: SnykConfig,
}

/// The gating rule: `target_package` must not resolve above `max_version`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Name of the package to check; every other package is ignored
    pub target_package: String,
    /// Highest allowed version (inclusive); anything strictly greater violates
    pub max_version: String,
}

/// Snyk REST API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnykConfig {
    /// Base URL of the REST API
    pub api_url: String,
    /// Value sent as the `version` query parameter
    pub api_version: String,
    /// Group whose organizations are scanned
    pub group_id: String,
    /// Base URL used to build links to projects in the report
    pub web_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Upper bound on pages followed for a single collection
    pub max_pages: u32,
    /// API token; read from `SNYK_API_TOKEN`, never written to config files
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            target_package: "package-xyz".to_string(),
            max_version: "0.0.2".to_string(),
        }
    }
}

impl GateConfig {
    pub fn new(target_package: impl Into<String>, max_version: impl Into<String>) -> Self {
        Self {
            target_package: target_package.into(),
            max_version: max_version.into(),
        }
    }

    /// Reject an empty target or a threshold that does not parse
    pub fn validate(&self) -> Result<()> {
        if self.target_package.trim().is_empty() {
            return Err(GateError::config("target_package must not be empty"));
        }
        parse_version(&self.max_version).map_err(|_| {
            GateError::config(format!(
                "max_version '{}' is not a valid version",
                self.max_version
            ))
        })?;
        Ok(())
    }
}

impl Default for SnykConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.snyk.io/rest".to_string(),
            api_version: "2023-08-31".to_string(),
            group_id: String::new(),
            web_url: "https://snyk.io".to_string(),
            timeout_secs: 30,
            max_pages: 100,
            token: std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty()),
        }
    }
}

impl SnykConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.group_id.trim().is_empty() {
            return Err(GateError::config("group_id is required for the remote report"));
        }
        if self.token.is_none() {
            return Err(GateError::config(format!(
                "{} environment variable not set",
                TOKEN_ENV_VAR
            )));
        }
        if self.max_pages == 0 {
            return Err(GateError::config("max_pages must be at least 1"));
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new builder for ScanConfig
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Load a TOML configuration file; missing sections fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: ScanConfig = toml::from_str(&content)?;
        if config.snyk.token.is_none() {
            config.snyk.token = std::env::var(TOKEN_ENV_VAR).ok().filter(|t| !t.is_empty());
        }
        Ok(config)
    }
}

/// Builder for ScanConfig
#[derive(Default)]
pub struct ScanConfigBuilder {
    target_package: Option<String>,
    max_version: Option<String>,
    snyk: Option<SnykConfig>,
    api_url: Option<String>,
    group_id: Option<String>,
    token: Option<String>,
}

impl ScanConfigBuilder {
    pub fn target_package(mut self, name: impl Into<String>) -> Self {
        self.target_package = Some(name.into());
        self
    }

    pub fn max_version(mut self, version: impl Into<String>) -> Self {
        self.max_version = Some(version.into());
        self
    }

    pub fn snyk(mut self, snyk: SnykConfig) -> Self {
        self.snyk = Some(snyk);
        self
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    pub fn group_id(mut self, id: impl Into<String>) -> Self {
        self.group_id = Some(id.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn build(self) -> ScanConfig {
        let mut gate = GateConfig::default();
        if let Some(name) = self.target_package {
            gate.target_package = name;
        }
        if let Some(version) = self.max_version {
            gate.max_version = version;
        }

        let mut snyk = self.snyk.unwrap_or_default();
        if let Some(url) = self.api_url {
            snyk.api_url = url;
        }
        if let Some(id) = self.group_id {
            snyk.group_id = id;
        }
        if self.token.is_some() {
            snyk.token = self.token;
        }

        ScanConfig { gate, snyk }
    }
}
