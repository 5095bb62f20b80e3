//! Server configuration from TOML or environment

use lestockage::StorageConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Default host address
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port number
pub const DEFAULT_PORT: u16 = 8080;

/// Default CORS origins (the operations UI in development)
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

/// Origin value that CORS with credentials cannot accept
pub const WILDCARD_ORIGIN: &str = "*";

/// Accepted values for `log_level`
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Errors loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are out of range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address
    pub host: String,

    /// Server port
    pub port: u16,

    /// Allowed CORS origins
    pub cors_origins: Vec<String>,

    /// Path to SQLite database
    pub db_path: String,

    /// Enable SQLite WAL mode
    pub wal_enabled: bool,

    /// Enable request logging
    pub enable_logging: bool,

    /// Log level for tracing
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            db_path: "leaccueil.db".to_string(),
            wal_enabled: true,
            enable_logging: true,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables with fallback to defaults
    ///
    /// Environment variables:
    /// - `LEACCUEIL_HOST` - Server host
    /// - `LEACCUEIL_PORT` - Server port
    /// - `LEACCUEIL_DB_PATH` - Database path
    /// - `LEACCUEIL_FRONTEND_URL` - Single allowed CORS origin
    /// - `LEACCUEIL_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides on top of `self`
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(host) = std::env::var("LEACCUEIL_HOST") {
            self.host = host;
        }

        if let Ok(port_str) = std::env::var("LEACCUEIL_PORT") {
            if let Ok(port) = port_str.parse::<u16>() {
                self.port = port;
            }
        }

        if let Ok(db_path) = std::env::var("LEACCUEIL_DB_PATH") {
            self.db_path = db_path;
        }

        if let Ok(frontend_url) = std::env::var("LEACCUEIL_FRONTEND_URL") {
            self.cors_origins = vec![frontend_url];
        }

        if let Ok(log_level) = std::env::var("LEACCUEIL_LOG_LEVEL") {
            self.log_level = log_level;
        }

        self
    }

    /// Load config from a TOML file; missing keys take defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse config from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Storage settings derived from this config
    #[must_use]
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            db_path: self.db_path.clone(),
            wal_enabled: self.wal_enabled,
            ..StorageConfig::default()
        }
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid address: {}", e))
    }

    /// Get the full server URL
    #[must_use]
    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be zero".to_string());
        }

        if self.host.is_empty() {
            return Err("Host cannot be empty".to_string());
        }

        if self.db_path.is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        if let Some(origin) = self
            .cors_origins
            .iter()
            .find(|origin| origin.trim() == WILDCARD_ORIGIN)
        {
            return Err(format!(
                "Invalid CORS origin: {}. Credentialed CORS needs explicit origins",
                origin
            ));
        }

        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.log_level,
                LOG_LEVELS.join(", ")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(!config.cors_origins.is_empty());
        assert_eq!(config.db_path, "leaccueil.db");
        assert!(config.enable_logging);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("LEACCUEIL_HOST", "0.0.0.0");
        std::env::set_var("LEACCUEIL_PORT", "9090");
        std::env::set_var("LEACCUEIL_DB_PATH", "/tmp/onboarding.db");
        std::env::set_var("LEACCUEIL_FRONTEND_URL", "https://ops.example.com");
        std::env::set_var("LEACCUEIL_LOG_LEVEL", "debug");

        let config = ServerConfig::from_env();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9090);
        assert_eq!(config.db_path, "/tmp/onboarding.db");
        assert_eq!(config.cors_origins, vec!["https://ops.example.com".to_string()]);
        assert_eq!(config.log_level, "debug");

        // Clean up
        std::env::remove_var("LEACCUEIL_HOST");
        std::env::remove_var("LEACCUEIL_PORT");
        std::env::remove_var("LEACCUEIL_DB_PATH");
        std::env::remove_var("LEACCUEIL_FRONTEND_URL");
        std::env::remove_var("LEACCUEIL_LOG_LEVEL");
    }

    #[test]
    fn test_config_from_file_partial() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 4000\ndb_path = \"ops.db\"").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.db_path, "ops.db");
        assert_eq!(config.host, DEFAULT_HOST);
    }

    #[test]
    fn test_config_from_file_rejects_bad_values() {
        assert!(matches!(
            ServerConfig::from_toml_str("log_level = \"loud\""),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ServerConfig::from_toml_str("port = \"eighty\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ServerConfig::from_file("/nonexistent/leaccueil.toml"),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_config_socket_addr() {
        let config = ServerConfig::default();
        let addr = config.socket_addr().expect("Default socket address should be valid");
        assert_eq!(addr.ip(), std::net::Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn test_config_server_url() {
        let config = ServerConfig {
            host: "localhost".to_string(),
            port: 3001,
            ..Default::default()
        };
        assert_eq!(config.server_url(), "http://localhost:3001");
    }

    #[test]
    fn test_config_validate_failures() {
        let port_zero = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(port_zero.validate().is_err());

        let empty_host = ServerConfig {
            host: String::new(),
            ..Default::default()
        };
        assert!(empty_host.validate().is_err());

        let empty_db = ServerConfig {
            db_path: String::new(),
            ..Default::default()
        };
        assert!(empty_db.validate().is_err());
    }

    #[test]
    fn test_config_rejects_wildcard_origin() {
        let wildcard = ServerConfig {
            cors_origins: vec!["*".to_string()],
            ..Default::default()
        };
        let err = wildcard.validate().unwrap_err();
        assert!(err.contains("CORS"));

        assert!(matches!(
            ServerConfig::from_toml_str("cors_origins = [\"https://ops.example.com\", \"*\"]"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_storage_config_follows_server_config() {
        let config = ServerConfig {
            db_path: "x.db".to_string(),
            wal_enabled: false,
            ..Default::default()
        };
        let storage = config.storage_config();
        assert_eq!(storage.db_path, "x.db");
        assert!(!storage.wal_enabled);
    }
}
