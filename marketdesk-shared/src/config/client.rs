use crate::{codec::Framing, models::UserId};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api/";
const DEFAULT_PUSH_URL: &str = "ws://localhost:5000/socket.io/?EIO=4&transport=websocket";

/// Messages per page for both the initial load and backward pagination.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Errors raised while resolving the client configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file extension is neither `yaml`/`yml` nor `json`.
    #[error("Unsupported configuration format. Use 'yaml' or 'json'.")]
    UnsupportedFormat,

    /// YAML content failed to parse.
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yml::Error),

    /// JSON content failed to parse.
    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable held an unusable value.
    #[error("Invalid {name} value: {reason}")]
    InvalidEnv {
        /// Variable name.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The resolved configuration failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration of the MarketDesk chat client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API; message endpoints are resolved against it.
    pub api_base_url: Url,

    /// WebSocket URL of the push channel.
    pub push_url: Url,

    /// Framing spoken by the push endpoint.
    pub push_framing: Framing,

    /// Identifier of the signed-in operator.
    pub user_id: Option<UserId>,

    /// Opaque bearer token issued by the external auth service.
    pub auth_token: Option<String>,

    /// Role label sent as `sentBy` on outbound messages.
    pub sent_by: String,

    /// Messages requested per page.
    pub page_size: usize,

    /// Maximum distance in seconds between a local send and its server echo.
    pub echo_window_secs: i64,

    /// Timeout applied to REST requests.
    pub request_timeout_secs: u64,

    /// Logging level used when `RUST_LOG` is not set.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[allow(clippy::expect_used)]
fn static_url(value: &str) -> Url {
    Url::parse(value).expect("built-in default URL is valid")
}

impl Config {
    /// Generates a default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_base_url: static_url(DEFAULT_API_BASE_URL),
            push_url: static_url(DEFAULT_PUSH_URL),
            push_framing: Framing::SocketIo,
            user_id: None,
            auth_token: None,
            sent_by: "admin".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            echo_window_secs: 5,
            request_timeout_secs: 30,
            log_level: "info".to_string(),
        }
    }

    /// Loads the configuration from a file, environment variables, or defaults.
    ///
    /// Precedence, lowest first: built-in defaults, the configuration file,
    /// `MARKETDESK_*` environment variables (only for values the file left at
    /// their default), then `user_override`.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to a `.yaml`, `.yml` or `.json` file
    /// * `user_override` - Operator id taking precedence over every other source
    ///
    /// # Returns
    /// A normalised and validated [`Config`].
    ///
    /// # Errors
    /// Returns a [`ConfigError`] when the file cannot be read or parsed, an
    /// environment variable is malformed, or validation fails.
    pub fn load_config(
        config_path: Option<PathBuf>,
        user_override: Option<UserId>,
    ) -> Result<Self, ConfigError> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::with_defaults(),
        };

        config.apply_env_overrides()?;

        if let Some(user) = user_override {
            config.user_id = Some(user);
        }

        config.normalize();
        config.validate().map_err(|errors| ConfigError::Invalid(errors.join("; ")))?;
        Ok(config)
    }

    fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        match extension.as_deref() {
            Some("yaml" | "yml") => Ok(serde_yml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            _ => Err(ConfigError::UnsupportedFormat),
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let defaults = Self::with_defaults();

        if self.api_base_url == defaults.api_base_url
            && let Ok(value) = env::var("MARKETDESK_API_BASE_URL")
        {
            self.api_base_url = parse_env_url("MARKETDESK_API_BASE_URL", &value)?;
        }
        if self.push_url == defaults.push_url
            && let Ok(value) = env::var("MARKETDESK_PUSH_URL")
        {
            self.push_url = parse_env_url("MARKETDESK_PUSH_URL", &value)?;
        }
        if self.push_framing == defaults.push_framing
            && let Ok(value) = env::var("MARKETDESK_PUSH_FRAMING")
        {
            self.push_framing = value.parse().map_err(|reason: &str| ConfigError::InvalidEnv {
                name: "MARKETDESK_PUSH_FRAMING",
                reason: reason.to_string(),
            })?;
        }
        if self.user_id.is_none()
            && let Ok(value) = env::var("MARKETDESK_USER_ID")
        {
            self.user_id = Some(value.parse().map_err(|reason: &str| {
                ConfigError::InvalidEnv {
                    name: "MARKETDESK_USER_ID",
                    reason: reason.to_string(),
                }
            })?);
        }
        if self.auth_token.is_none()
            && let Ok(value) = env::var("MARKETDESK_AUTH_TOKEN")
        {
            self.auth_token = Some(value);
        }
        if self.page_size == defaults.page_size
            && let Ok(value) = env::var("MARKETDESK_PAGE_SIZE")
        {
            self.page_size = value.parse().map_err(|_| ConfigError::InvalidEnv {
                name: "MARKETDESK_PAGE_SIZE",
                reason: "must be a positive integer".to_string(),
            })?;
        }
        if self.log_level == defaults.log_level
            && let Ok(value) = env::var("MARKETDESK_LOG_LEVEL")
        {
            self.log_level = value;
        }

        Ok(())
    }

    /// Ensure the API base ends with `/` so relative endpoints join beneath it.
    fn normalize(&mut self) {
        if !self.api_base_url.path().ends_with('/') {
            let path = format!("{}/", self.api_base_url.path());
            self.api_base_url.set_path(&path);
        }
    }

    /// Validate the configuration, collecting every problem found.
    ///
    /// # Errors
    /// Returns the list of validation messages when any check fails.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.page_size == 0 {
            errors.push("page_size must be greater than 0".to_string());
        }
        if self.echo_window_secs < 0 {
            errors.push("echo_window_secs must not be negative".to_string());
        }
        if self.request_timeout_secs == 0 {
            errors.push("request_timeout_secs must be greater than 0".to_string());
        }
        if !matches!(self.api_base_url.scheme(), "http" | "https") {
            errors.push(format!(
                "api_base_url must use http or https, got {}",
                self.api_base_url.scheme()
            ));
        }
        if !matches!(self.push_url.scheme(), "ws" | "wss") {
            errors.push(format!(
                "push_url must use ws or wss, got {}",
                self.push_url.scheme()
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn parse_env_url(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|err| ConfigError::InvalidEnv {
        name,
        reason: err.to_string(),
    })
}
