//! Gateway runtime configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (applied by the binary on top of the loaded config)
//! 2. Environment variables (a `.env` file is loaded into the environment first)
//! 3. Built-in defaults
//!
//! | Variable                  | Default                                             |
//! |---------------------------|-----------------------------------------------------|
//! | `COMPLETION_API_URL`      | `https://api.groq.com/openai/v1/chat/completions`   |
//! | `COMPLETION_API_KEY`      | required                                            |
//! | `COMPLETION_MODEL`        | `llama-3.1-8b-instant`                              |
//! | `COMPLETION_TIMEOUT_SECS` | `120`                                               |
//! | `HOST` / `PORT`           | `0.0.0.0` / `5000`                                  |
//! | `STATIC_DIR`              | unset (no static file serving)                      |

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_UPSTREAM_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

pub const ENV_UPSTREAM_URL: &str = "COMPLETION_API_URL";
pub const ENV_API_KEY: &str = "COMPLETION_API_KEY";
pub const ENV_MODEL: &str = "COMPLETION_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "COMPLETION_TIMEOUT_SECS";
pub const ENV_HOST: &str = "HOST";
pub const ENV_PORT: &str = "PORT";
pub const ENV_STATIC_DIR: &str = "STATIC_DIR";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingVar(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide gateway configuration, built once at startup and handed to
/// [`crate::CompletionGateway`] by value.
#[derive(Clone)]
pub struct GatewayConfig {
    /// Full URL of the upstream chat-completions endpoint.
    pub upstream_url: String,
    /// Bearer credential sent upstream. Never accepted from clients.
    pub api_key: String,
    /// Fixed model identifier used for every relayed prompt.
    pub model: String,
    /// Upper bound for one upstream exchange, enforced by the HTTP client.
    pub request_timeout: Duration,
    pub host: String,
    pub port: u16,
    /// Directory of a built frontend to serve for non-API paths.
    pub static_dir: Option<PathBuf>,
}

impl GatewayConfig {
    /// Config with defaults for everything except the endpoint and credential.
    pub fn new(upstream_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            upstream_url: upstream_url.into(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values are treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get(ENV_API_KEY).ok_or(ConfigError::MissingVar(ENV_API_KEY))?;
        let upstream_url = get(ENV_UPSTREAM_URL).unwrap_or_else(|| DEFAULT_UPSTREAM_URL.into());

        let mut config = Self::new(upstream_url, api_key);

        if let Some(model) = get(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            let secs = parse_var::<u64>(ENV_TIMEOUT_SECS, &raw)?;
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(host) = get(ENV_HOST) {
            config.host = host;
        }
        if let Some(raw) = get(ENV_PORT) {
            config.port = parse_var::<u16>(ENV_PORT, &raw)?;
        }
        config.static_dir = get(ENV_STATIC_DIR).map(PathBuf::from);

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Socket address string the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidVar {
        var,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("upstream_url", &self.upstream_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("request_timeout", &self.request_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}
