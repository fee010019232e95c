//! Service configuration
//!
//! Loaded from a JSON settings file. Any string value of the exact form
//! `$NAME` is replaced by the environment variable `NAME` before the file is
//! interpreted, so secrets can stay out of the file:
//!
//! ```json
//! {
//!     "data_dir": "/var/lib/commentd",
//!     "admin_password": "$COMMENTS_ADMIN_PASSWORD",
//!     "email": { "smtp_host": "smtp.example.com", "smtp_password": "$SMTP_PASSWORD" }
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::captcha::CaptchaConfig;
use crate::notify::EmailConfig;

/// Log output formats accepted by `log_format`
pub const LOG_FORMATS: &[&str] = &["json", "text"];

/// Configuration loading failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "COMMENTS_CONFIG_READ",
            ConfigError::Parse(_) => "COMMENTS_CONFIG_PARSE",
            ConfigError::Invalid(_) => "COMMENTS_CONFIG_INVALID",
        }
    }
}

/// Settings file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the comment log
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Shared admin secret; empty disables the admin endpoints
    #[serde(default)]
    pub admin_password: String,

    /// "json" or "text"
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Default level filter, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub captcha: Option<CaptchaConfig>,

    #[serde(default)]
    pub email: Option<EmailConfig>,
}

fn default_data_dir() -> String {
    "./data".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    2369
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            admin_password: String::new(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            captcha: None,
            email: None,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parse, expand `$ENV` references, and validate.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Self::from_json_with_env(content, |name| std::env::var(name).ok())
    }

    /// Like `from_json`, with an explicit environment lookup.
    pub fn from_json_with_env(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut raw: Value = serde_json::from_str(content)?;
        let pattern = env_reference_pattern()?;
        expand_env(&mut raw, &pattern, &lookup);

        let config: Config = serde_json::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be > 0".to_string()));
        }

        if !LOG_FORMATS.contains(&self.log_format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_format: '{}'. Expected one of {:?}",
                self.log_format, LOG_FORMATS
            )));
        }

        Ok(())
    }

    /// Get data directory as Path
    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    /// `host:port` to bind the HTTP listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_reference_pattern() -> Result<Regex, ConfigError> {
    Regex::new(r"^\$([A-Z_]+)$")
        .map_err(|e| ConfigError::Invalid(format!("env pattern: {}", e)))
}

/// Replaces `$NAME` strings anywhere in the tree. Unset variables become "".
fn expand_env(value: &mut Value, pattern: &Regex, lookup: &impl Fn(&str) -> Option<String>) {
    match value {
        Value::String(s) => {
            if let Some(name) = pattern.captures(s).and_then(|c| c.get(1)) {
                let resolved = lookup(name.as_str()).unwrap_or_default();
                *s = resolved;
            }
        }
        Value::Array(items) => {
            for item in items {
                expand_env(item, pattern, lookup);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                expand_env(item, pattern, lookup);
            }
        }
        _ => {}
    }
}
