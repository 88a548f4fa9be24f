use std::env;

use docvault_core::config::{parse_or, ConfigError, VersioningConfig};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// PostgreSQL connection URL. Without one the server keeps everything in
    /// memory.
    pub database_url: Option<String>,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// Minimum database connections in the pool.
    pub db_min_connections: u32,
    /// Largest request body accepted, in bytes.
    pub body_limit_bytes: usize,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    pub versioning: VersioningConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3030,
            database_url: None,
            db_max_connections: 20,
            db_min_connections: 5,
            body_limit_bytes: 2 * 1024 * 1024,
            log_level: "info".to_string(),
            versioning: VersioningConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", "u16", defaults.port)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_or(
                &lookup,
                "DB_MAX_CONNECTIONS",
                "u32",
                defaults.db_max_connections,
            )?,
            db_min_connections: parse_or(
                &lookup,
                "DB_MIN_CONNECTIONS",
                "u32",
                defaults.db_min_connections,
            )?,
            body_limit_bytes: parse_or(
                &lookup,
                "BODY_LIMIT_BYTES",
                "usize",
                defaults.body_limit_bytes,
            )?,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            versioning: VersioningConfig::from_lookup(&lookup)?,
        })
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
