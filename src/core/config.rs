use crate::core::errors::{ConfigError, ConfigResult};
use std::env;
use std::path::Path;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
    /// Maximum accepted request body size in bytes (batch uploads).
    pub max_body_bytes: usize,
}

/// Remote transformer service configuration.
///
/// The transformer (detection + extraction + translation) is an external
/// collaborator reached over HTTP; its location is an explicit config
/// value, never discovered from the filesystem.
#[derive(Debug, Clone)]
pub struct TransformerConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderingConfig {
    /// Directory scanned for font files at startup.
    pub font_dir: String,
    pub font_size: f32,
}

/// Query limits
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum records returned by history queries.
    pub history_limit: usize,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub transformer: TransformerConfig,
    pub rendering: RenderingConfig,
    pub limits: LimitsConfig,
}

impl Config {
    pub fn new() -> ConfigResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::load_from_env();
        config.validate()?;
        Ok(config)
    }

    fn load_from_env() -> Self {
        // Parse log level
        let log_level = env::var("LOG_LEVEL")
            .ok()
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        Self {
            server: ServerConfig {
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(8000),
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                log_level,
                max_body_bytes: env::var("MAX_BODY_BYTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(200 * 1024 * 1024),
            },
            transformer: TransformerConfig {
                base_url: env::var("TRANSFORMER_URL")
                    .unwrap_or_else(|_| "http://127.0.0.1:9000".to_string()),
                timeout_seconds: env::var("TRANSFORMER_TIMEOUT_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            },
            rendering: RenderingConfig {
                font_dir: env::var("FONT_DIR").unwrap_or_else(|_| "fonts".to_string()),
                font_size: env::var("FONT_SIZE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(16.0),
            },
            limits: LimitsConfig {
                history_limit: env::var("HISTORY_LIMIT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(100),
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.transformer.base_url.trim().is_empty() {
            return Err(ConfigError::MissingTransformerUrl);
        }

        // A missing font directory must surface at startup, not at render time
        if !Path::new(&self.rendering.font_dir).is_dir() {
            return Err(ConfigError::InvalidFontDir(self.rendering.font_dir.clone()));
        }

        if !(6.0..=72.0).contains(&self.rendering.font_size) {
            return Err(ConfigError::InvalidFontSize(self.rendering.font_size));
        }

        if self.limits.history_limit == 0 {
            return Err(ConfigError::InvalidHistoryLimit(self.limits.history_limit));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::InvalidBodyLimit(self.server.max_body_bytes));
        }

        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn server_host(&self) -> &str {
        &self.server.host
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }

    pub fn max_body_bytes(&self) -> usize {
        self.server.max_body_bytes
    }

    pub fn transformer_url(&self) -> &str {
        &self.transformer.base_url
    }

    pub fn transformer_timeout_seconds(&self) -> u64 {
        self.transformer.timeout_seconds
    }

    pub fn font_dir(&self) -> &str {
        &self.rendering.font_dir
    }

    pub fn font_size(&self) -> f32 {
        self.rendering.font_size
    }

    pub fn history_limit(&self) -> usize {
        self.limits.history_limit
    }
}

// Note: no Default implementation because Config::new() can fail.
