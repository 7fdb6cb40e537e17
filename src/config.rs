//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub feed: FeedConfig,
    pub chat: ChatConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 7777)
    pub port: u16,
    /// Browser origin allowed by CORS; any origin when unset
    #[serde(default)]
    pub allowed_origin: Option<String>,
}

impl ServerConfig {
    /// Socket address string used for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Identity boundary configuration
///
/// Tokens are issued by the external auth layer; this service only
/// verifies them.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC secret (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Feed pagination configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Page size when the caller gives none (default: 10)
    pub default_page_size: u32,
    /// Upper bound on any requested page size (default: 50)
    pub max_page_size: u32,
}

/// Chat configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Maximum message length in characters after trimming (default: 2000)
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (KINDRED__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 7777)?
            .set_default("database.path", "data/kindred.db")?
            .set_default("auth.session_max_age", 604800)?
            .set_default("feed.default_page_size", 10)?
            .set_default("feed.max_page_size", 50)?
            .set_default("chat.max_message_length", 2000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("KINDRED")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.feed.default_page_size == 0 || self.feed.max_page_size == 0 {
            return Err(crate::error::AppError::Config(
                "feed page sizes must be greater than 0".to_string(),
            ));
        }

        if self.feed.default_page_size > self.feed.max_page_size {
            return Err(crate::error::AppError::Config(
                "feed.default_page_size must not exceed feed.max_page_size".to_string(),
            ));
        }

        if self.chat.max_message_length == 0 {
            return Err(crate::error::AppError::Config(
                "chat.max_message_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
