// Application configuration: the app identity (consumer key/secret) plus
// optional proxy and a fallback access-token pair.
//
// Loaded from `./config.json` by default. A missing file is replaced by an
// empty template so the operator knows what to fill in. Environment
// variables override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// Default config file, relative to the working directory
pub const CONFIG_FILE: &str = "config.json";

const ENV_CONSUMER_KEY: &str = "CONSUMER_KEY";
const ENV_CONSUMER_SECRET: &str = "CONSUMER_SECRET";
const ENV_ACCESS_TOKEN: &str = "ACCESS_TOKEN";
const ENV_ACCESS_TOKEN_SECRET: &str = "ACCESS_TOKEN_SECRET";
const ENV_PROXY: &str = "TWEETPIN_PROXY";

#[derive(Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_secret: Option<String>,
}

// Secrets stay out of debug output and logs.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("proxy", &self.proxy)
            .field("access_token", &self.access_token)
            .field(
                "access_token_secret",
                &self.access_token_secret.as_deref().map(redact),
            )
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl AppConfig {
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            ..Self::default()
        }
    }

    /// Load the file at `path` and apply process environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_file(path)?;
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Read the config file, writing an empty template first if it is absent.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "config file missing, writing empty template");
            Self::write_template(path)?;
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    fn write_template(path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::WriteTemplate {
            path: PathBuf::from(path),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let contents = serde_json::to_string_pretty(&Self::default()).map_err(|e| {
            ConfigError::WriteTemplate {
                path: path.to_path_buf(),
                source: e.into(),
            }
        })?;
        std::fs::write(path, contents + "\n").map_err(write_err)
    }

    /// Override fields with non-empty values returned by `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_CONSUMER_KEY) {
            self.consumer_key = v;
        }
        if let Some(v) = get(ENV_CONSUMER_SECRET) {
            self.consumer_secret = v;
        }
        if let Some(v) = get(ENV_ACCESS_TOKEN) {
            self.access_token = Some(v);
        }
        if let Some(v) = get(ENV_ACCESS_TOKEN_SECRET) {
            self.access_token_secret = Some(v);
        }
        if let Some(v) = get(ENV_PROXY) {
            self.proxy = Some(v);
        }
        self
    }

    /// Both consumer fields must be non-empty before any handshake or API call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.consumer_key.trim().is_empty() {
            return Err(ConfigError::Incomplete("consumer_key"));
        }
        if self.consumer_secret.trim().is_empty() {
            return Err(ConfigError::Incomplete("consumer_secret"));
        }
        if let Some(proxy) = self.proxy.as_deref().filter(|p| !p.is_empty()) {
            url::Url::parse(proxy).map_err(|_| ConfigError::InvalidProxy(proxy.to_string()))?;
        }
        Ok(())
    }

    /// The configured access pair, if both halves are present.
    pub fn access_pair(&self) -> Option<(&str, &str)> {
        match (self.access_token.as_deref(), self.access_token_secret.as_deref()) {
            (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
                Some((token, secret))
            }
            _ => None,
        }
    }
}
