//! Configuration Management
//!
//! Loads API credentials from `~/.panapi/config.yml`, with environment
//! variables taking precedence over the file.

use crate::error::{Error, Result};
use crate::session::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default OAuth2 token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://auth.apps.paloaltonetworks.com/am/oauth2/access_token";

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// User configuration as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// OAuth2 scope, e.g. `profile tsg_id:1234567890 email`
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".panapi").join("config.yml"))
    }

    /// Load configuration from `path` (or the default path), then apply
    /// environment overrides. A missing file yields an empty config.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::default_path);

        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Override fields from `PANAPI_*` variables found by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut Option<String>); 5] = [
            ("PANAPI_CLIENT_ID", &mut self.client_id),
            ("PANAPI_CLIENT_SECRET", &mut self.client_secret),
            ("PANAPI_SCOPE", &mut self.scope),
            ("PANAPI_TOKEN_URL", &mut self.token_url),
            ("PANAPI_BASE_URL", &mut self.base_url),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                *field = Some(value);
            }
        }
    }

    /// Validate and resolve into session credentials
    pub fn credentials(&self) -> Result<Credentials> {
        let required = |value: &Option<String>, key: &str| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("missing required setting `{key}`")))
        };

        let mut credentials = Credentials::new(
            required(&self.client_id, "client_id")?,
            required(&self.client_secret, "client_secret")?,
            required(&self.scope, "scope")?,
        );
        if let Some(token_url) = &self.token_url {
            credentials = credentials.with_token_url(validate_url(token_url, "token_url")?);
        }
        if let Some(base_url) = &self.base_url {
            credentials = credentials.with_base_url(validate_url(base_url, "base_url")?);
        }
        if let Some(secs) = self.timeout_secs {
            credentials.timeout = Duration::from_secs(secs);
        }
        Ok(credentials)
    }
}

fn validate_url(value: &str, key: &str) -> Result<String> {
    let url = Url::parse(value).map_err(|e| Error::Config(format!("invalid `{key}`: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "invalid `{key}`: unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(value.to_string())
}

/// Resolved credentials and endpoints for an [`crate::ApiSession`]
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub scope: String,
    pub token_url: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: scope.into(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Trailing slashes are dropped so endpoint paths join cleanly
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("scope", &self.scope)
            .field("token_url", &self.token_url)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
