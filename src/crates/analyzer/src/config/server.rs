//! Server configuration for sop-analyzer-server
//!
//! Loads `sop-analyzer.toml` with server, database, security, LLM and
//! pipeline settings. Every section has defaults, so a missing file or a
//! partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tooling::RetryPolicy;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Server identification and listen address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfoConfig {
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_server_name() -> String {
    "sop-analyzer".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "sop-analyzer.db".to_string()
}

/// Security mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SecurityMode {
    /// Caller identity header only
    #[default]
    Open,
    /// Caller identity header plus a shared bearer key
    SecretKey,
}

/// Security configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub mode: SecurityMode,
    /// Secret key (overridden by the SECRET_KEY environment variable)
    #[serde(default)]
    pub secret_key: Option<String>,
}

/// Scoring gateway configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4.1-mini".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Checkpoint cadence and terminal write policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Persist after every N-th cell by absolute matrix position
    #[serde(default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,
    /// Attempts for the last-cell and error-path checkpoint writes
    #[serde(default = "default_terminal_write_attempts")]
    pub terminal_write_attempts: usize,
    /// Initial backoff between terminal write attempts
    #[serde(default = "default_terminal_write_backoff_ms")]
    pub terminal_write_backoff_ms: u64,
    /// Events buffered between the pipeline and the stream consumer
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: default_checkpoint_interval(),
            terminal_write_attempts: default_terminal_write_attempts(),
            terminal_write_backoff_ms: default_terminal_write_backoff_ms(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl PipelineConfig {
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    pub fn with_terminal_write_attempts(mut self, attempts: usize) -> Self {
        self.terminal_write_attempts = attempts;
        self
    }

    pub fn with_terminal_write_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.terminal_write_backoff_ms = backoff_ms;
        self
    }

    /// Whether the cell at absolute `position` triggers a periodic checkpoint
    pub fn is_checkpoint_position(&self, position: usize) -> bool {
        (position + 1) % self.checkpoint_interval.max(1) == 0
    }

    /// Retry policy for terminal checkpoint writes
    pub fn terminal_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.terminal_write_attempts)
            .with_initial_interval(Duration::from_millis(self.terminal_write_backoff_ms))
    }

    pub fn validate(&self) -> Result<(), ServerConfigError> {
        if self.checkpoint_interval == 0 {
            return Err(ServerConfigError::InvalidConfig(
                "pipeline.checkpoint_interval must be at least 1".to_string(),
            ));
        }
        if self.terminal_write_attempts == 0 {
            return Err(ServerConfigError::InvalidConfig(
                "pipeline.terminal_write_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_checkpoint_interval() -> usize {
    5
}

fn default_terminal_write_attempts() -> usize {
    3
}

fn default_terminal_write_backoff_ms() -> u64 {
    250
}

fn default_stream_buffer() -> usize {
    32
}

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerInfoConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ServerConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ServerConfigError::ReadError)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML string
    pub fn parse(content: &str) -> Result<Self, ServerConfigError> {
        let config: Self = toml::from_str(content).map_err(ServerConfigError::ParseError)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load configuration from the default locations, then apply env overrides
    ///
    /// Searches for config in:
    /// 1. CONFIG_PATH environment variable
    /// 2. ./config/sop-analyzer.toml
    /// 3. ../config/sop-analyzer.toml (for development)
    /// 4. ./sop-analyzer.toml
    ///
    /// Falls back to defaults when no file exists.
    pub fn load() -> Result<Self, ServerConfigError> {
        let mut config = match Self::locate() {
            Some(path) => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(config_path));
        }

        [
            "config/sop-analyzer.toml",
            "../config/sop-analyzer.toml",
            "./sop-analyzer.toml",
        ]
        .into_iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
    }

    /// Apply HOST, PORT and DATABASE_PATH overrides
    pub fn apply_env_overrides(&mut self) -> Result<(), ServerConfigError> {
        if let Ok(host) = std::env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ServerConfigError::InvalidConfig(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            self.database.path = path;
        }
        Ok(())
    }

    /// Get the secret key, checking environment variable first
    pub fn get_secret_key(&self) -> Option<String> {
        std::env::var("SECRET_KEY")
            .ok()
            .or_else(|| self.security.secret_key.clone())
    }

    /// Get database URL from configuration
    pub fn database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.database.path)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
