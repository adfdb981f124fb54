//! Rule configuration: matching predicates, response specs, and loading.
//!
//! The configuration is read once at startup, defaulted, validated, and
//! then shared read-only across all request handlers.

use axum::http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upper bound for a configured response delay, in milliseconds.
pub const MAX_DELAY_MS: u64 = 10_000;

/// Paths probed by [`Config::load`] when no explicit file is given.
const DEFAULT_CONFIG_PATHS: &[&str] = &["config.yaml", "config/config.yaml"];

/// Errors produced while loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find config file in any of {0:?}")]
    NotFound(Vec<PathBuf>),

    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("error parsing config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("server port is required")]
    MissingPort,

    #[error("request rule {index}: {reason}")]
    Rule { index: usize, reason: String },
}

/// Top-level configuration: server settings plus the ordered rule list.
///
/// Rule order is significant. The selector evaluates rules in declaration
/// order and the first match wins.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Ordered list of request matching rules
    #[serde(default)]
    pub requests: Vec<RequestRule>,
}

impl Config {
    /// Load configuration from an explicit YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration by probing the default search paths.
    pub fn load() -> Result<Self, ConfigError> {
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Err(ConfigError::NotFound(
            DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect(),
        ))
    }

    /// Parse a YAML document and apply defaults.
    ///
    /// Field-constraint checks are deferred to [`Config::validate`]; this
    /// only fails on malformed YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.set_defaults();
        Ok(config)
    }

    fn set_defaults(&mut self) {
        for rule in &mut self.requests {
            if rule.method.is_empty() {
                rule.method = default_method();
            }
            rule.method = rule.method.to_uppercase();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::MissingPort);
        }

        for (index, rule) in self.requests.iter().enumerate() {
            rule.validate()
                .map_err(|reason| ConfigError::Rule { index, reason })?;
        }

        Ok(())
    }
}

/// Server-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Port the HTTP server listens on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    8080
}

/// A single request matching rule paired with the response to emit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestRule {
    /// Request path, matched by full exact string
    pub path: String,

    /// HTTP method, uppercased at load time
    #[serde(default = "default_method")]
    pub method: String,

    /// Header name -> pattern. Empty means "match any headers".
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Query parameter name -> pattern. Empty means "match any query".
    #[serde(default, rename = "queryParams")]
    pub query_params: HashMap<String, String>,

    /// Pattern matched against the raw request body. Empty matches any body.
    #[serde(default)]
    pub body: String,

    /// Artificial latency applied before responding
    #[serde(default, rename = "responseDelay")]
    pub response_delay: Option<ResponseDelay>,

    /// Response to return when this rule matches
    #[serde(default)]
    pub response: ResponseSpec,
}

fn default_method() -> String {
    "GET".to_string()
}

impl RequestRule {
    fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("path is required".to_string());
        }
        if self.method.is_empty() {
            return Err("method is required".to_string());
        }
        if let Some(delay) = &self.response_delay {
            delay.validate()?;
        }
        self.response.validate()
    }
}

/// Delay range in milliseconds, inclusive on both ends.
///
/// `min == max` yields a fixed delay; otherwise a uniform draw in
/// `[min, max]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseDelay {
    #[serde(default)]
    pub min: u64,
    #[serde(default)]
    pub max: u64,
}

impl ResponseDelay {
    fn validate(&self) -> Result<(), String> {
        if self.min > self.max {
            return Err(format!(
                "responseDelay min ({}) cannot exceed max ({})",
                self.min, self.max
            ));
        }
        if self.max > MAX_DELAY_MS {
            return Err(format!(
                "responseDelay max ({}) exceeds maximum allowed ({}ms)",
                self.max, MAX_DELAY_MS
            ));
        }
        Ok(())
    }
}

/// Response returned for a matched rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseSpec {
    /// HTTP status code
    #[serde(default = "default_status", rename = "status-code")]
    pub status_code: u16,

    /// Response headers
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Response body. Absent means no body is written.
    #[serde(default)]
    pub body: Option<ResponseBody>,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status_code: default_status(),
            headers: HashMap::new(),
            body: None,
        }
    }
}

fn default_status() -> u16 {
    200
}

impl ResponseSpec {
    fn validate(&self) -> Result<(), String> {
        if self.status_code < 100 || self.status_code > 599 {
            return Err(format!("invalid status code {}", self.status_code));
        }
        for (name, value) in &self.headers {
            if name.parse::<HeaderName>().is_err() {
                return Err(format!("invalid response header name {name:?}"));
            }
            if value.parse::<HeaderValue>().is_err() {
                return Err(format!("invalid response header value for {name:?}"));
            }
        }
        Ok(())
    }
}

/// Response body: a literal string passed through verbatim, or any other
/// YAML value serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Text(String),
    Json(serde_json::Value),
}
