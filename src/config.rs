//! Runtime configuration.
//!
//! Settings come from `USERFORGE_*` environment variables and can be
//! overridden by CLI flags through the `with_*` builders.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::batch::FailurePolicy;

pub const ENV_DATABASE_URL: &str = "USERFORGE_DATABASE_URL";
pub const ENV_UPLOADS_DIR: &str = "USERFORGE_UPLOADS_DIR";
pub const ENV_AVATAR_API_URL: &str = "USERFORGE_AVATAR_API_URL";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "USERFORGE_HTTP_TIMEOUT_SECS";
pub const ENV_FAILURE_POLICY: &str = "USERFORGE_FAILURE_POLICY";

/// Errors that can occur while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Settings shared by every command.
#[derive(Debug, Clone, PartialEq)]
pub struct ForgeConfig {
    /// SQLite URL or path of the user directory.
    pub database_url: String,
    /// Root directory for stored media.
    pub uploads_dir: PathBuf,
    /// Avatar listing endpoint. Unset means no avatars.
    pub avatar_api_url: Option<String>,
    /// Timeout applied to every avatar HTTP request.
    pub http_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://userforge.db".to_string(),
            uploads_dir: PathBuf::from("./uploads"),
            avatar_api_url: None,
            http_timeout: Duration::from_secs(30),
            failure_policy: FailurePolicy::Ignore,
        }
    }
}

impl ForgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `USERFORGE_DATABASE_URL`: user directory (default: sqlite://userforge.db)
    /// - `USERFORGE_UPLOADS_DIR`: media root (default: ./uploads)
    /// - `USERFORGE_AVATAR_API_URL`: avatar listing endpoint (default: unset)
    /// - `USERFORGE_HTTP_TIMEOUT_SECS`: avatar request timeout (default: 30)
    /// - `USERFORGE_FAILURE_POLICY`: ignore, collect or abort (default: ignore)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(val) = lookup(ENV_DATABASE_URL) {
            config.database_url = val;
        }

        if let Some(val) = lookup(ENV_UPLOADS_DIR) {
            config.uploads_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup(ENV_AVATAR_API_URL) {
            let val = val.trim();
            if !val.is_empty() {
                config.avatar_api_url = Some(val.to_string());
            }
        }

        if let Some(val) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            let secs: u64 = parse_env_value(&val, ENV_HTTP_TIMEOUT_SECS)?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(val) = lookup(ENV_FAILURE_POLICY) {
            config.failure_policy = val.parse().map_err(|message| ConfigError::InvalidValue {
                key: ENV_FAILURE_POLICY.to_string(),
                message,
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "database_url cannot be empty".to_string(),
            ));
        }

        if self.uploads_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "uploads_dir cannot be empty".to_string(),
            ));
        }

        if self.http_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "http_timeout must be greater than 0".to_string(),
            ));
        }

        if let Some(url) = &self.avatar_api_url {
            if crate::avatar::sanitize_url(url).is_none() {
                return Err(ConfigError::ValidationFailed(format!(
                    "avatar_api_url must be an http(s) URL, got '{}'",
                    url
                )));
            }
        }

        Ok(())
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    pub fn with_uploads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads_dir = dir.into();
        self
    }

    pub fn with_avatar_api_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_api_url = Some(url.into());
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Parse an environment variable value into a type.
fn parse_env_value<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("could not parse '{}'", value),
    })
}
