//! Configuration loading, validation, and management for Banter.
//!
//! Loads configuration from `./banter.toml` (or an explicit path) and applies
//! environment variable overrides on top. A `.env` file in the working
//! directory is read first, so `NLP_API_KEY=...` there behaves like an
//! exported variable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "banter.toml";

/// The root configuration structure.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Joint token budget for input + chat history + context per request
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,

    /// Hosted NLP engine settings
    #[serde(default)]
    pub nlp: NlpConfig,

    /// HTTP server settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// SQLite settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

fn default_token_limit() -> usize {
    2048
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("token_limit", &self.token_limit)
            .field("nlp", &self.nlp)
            .field("gateway", &self.gateway)
            .field("database", &self.database)
            .finish()
    }
}

impl std::fmt::Debug for NlpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NlpConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("use_gpu", &self.use_gpu)
            .field("lang", &self.lang)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    /// API token for the hosted engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Model the chatbot requests are sent to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Route requests to GPU-backed models
    #[serde(default = "default_true")]
    pub use_gpu: bool,

    /// Optional language prefix for multilingual add-on (e.g. "fra_Latn")
    #[serde(default)]
    pub lang: String,

    /// Per-request timeout for engine calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://api.nlpcloud.io/v1".into()
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            api_url: default_api_url(),
            use_gpu: true,
            lang: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl NlpConfig {
    /// The API key and model, or the first one that is missing.
    ///
    /// The server refuses to start without both.
    pub fn require_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingRequired("NLP_API_KEY"))?;
        let model = self
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .ok_or(ConfigError::MissingRequired("NLP_MODEL"))?;
        Ok((api_key, model))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins. Empty = any origin.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_allowed_origins: vec![],
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, or `sqlite::memory:` for an ephemeral store
    #[serde(default = "default_database_path")]
    pub path: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    "./database.db".into()
}
fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl AppConfig {
    /// Load configuration for this process.
    ///
    /// Reads `.env`, then `path` (which must exist) or `./banter.toml` (which
    /// may be absent), then applies environment variable overrides:
    /// - `NLP_API_KEY`, `NLP_MODEL`, `NLP_API_URL`
    /// - `TOKEN_LIMIT`
    /// - `SERVER_PORT`
    /// - `BANTER_DATABASE_PATH`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        load_dotenv();

        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::ReadError {
                    path: path.to_path_buf(),
                    reason: "file not found".into(),
                });
            }
            Some(path) => Self::load_from(path)?,
            None => Self::load_from(&Self::default_path())?,
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// `./banter.toml`
    pub fn default_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Empty values are ignored so that `NLP_MODEL=` in a `.env` file does
    /// not wipe a model configured in TOML.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("NLP_API_KEY") {
            self.nlp.api_key = Some(key);
        }
        if let Some(model) = get("NLP_MODEL") {
            self.nlp.model = Some(model);
        }
        if let Some(url) = get("NLP_API_URL") {
            self.nlp.api_url = url;
        }
        if let Some(raw) = get("TOKEN_LIMIT") {
            self.token_limit = parse_env("TOKEN_LIMIT", &raw)?;
        }
        if let Some(raw) = get("SERVER_PORT") {
            self.gateway.port = parse_env("SERVER_PORT", &raw)?;
        }
        if let Some(path) = get("BANTER_DATABASE_PATH") {
            self.database.path = path;
        }
        Ok(())
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_limit == 0 {
            return Err(ConfigError::ValidationError(
                "token_limit must be greater than 0".into(),
            ));
        }

        if self.gateway.port == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.port must be greater than 0".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// `host:port` the server binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.gateway.host, self.gateway.port)
    }

    /// Generate a starter config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let mut config = Self::default();
        config.nlp.model = Some("finetuned-llama-3-70b".into());
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            token_limit: default_token_limit(),
            nlp: NlpConfig::default(),
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

/// Read `.env` from the working directory if there is one.
///
/// Variables already present in the process environment win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {e}"),
    }
}

fn parse_env<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnv {
        key,
        value: raw.to_string(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error("{0} is missing. Set it in the environment, a .env file, or banter.toml")]
    MissingRequired(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}
