//! Configuration loading and defaults.
//!
//! Configuration is resolved in order of precedence (highest wins):
//!
//! 1. **Environment variables**: `WARBLER_LISTEN`, `WARBLER_SECRET_KEY`,
//!    `DATABASE_URL`
//! 2. **Config file**: path via `--config <path>`, or `warbler.toml` in CWD
//! 3. **Compiled defaults**: see each field's default value below
//!
//! The TOML file mirrors the struct hierarchy:
//!
//! ```toml
//! [server]
//! listen = "127.0.0.1:5000"
//! static_dir = "static"
//!
//! [database]
//! path = "warbler.db"        # or ":memory:"
//!
//! [auth]
//! secret_key = "your-secret-key"
//! csrf_enabled = true
//!
//! [logging]
//! level = "info"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::util::expand_tilde;

/// Secret used when nothing is configured. Triggers a startup warning.
pub const DEFAULT_SECRET_KEY: &str = "it's a secret";

/// Errors raised while reading or parsing the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level configuration, deserialized from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (default `127.0.0.1:5000`).
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Directory served under `/static` (default `static`).
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// SQLite database location.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the database file, or `:memory:`. Override with `DATABASE_URL`.
    #[serde(default = "default_database_path")]
    pub path: String,
}

/// Session and form protection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Key material for signing the session cookie. Override with
    /// `WARBLER_SECRET_KEY`.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Reject form posts without a matching CSRF token (default true).
    #[serde(default = "default_csrf_enabled")]
    pub csrf_enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter level (default `info`). Overridden by `RUST_LOG` env var.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_listen() -> String {
    "127.0.0.1:5000".to_string()
}
fn default_static_dir() -> String {
    "static".to_string()
}
fn default_database_path() -> String {
    "warbler.db".to_string()
}
fn default_secret_key() -> String {
    DEFAULT_SECRET_KEY.to_string()
}
fn default_csrf_enabled() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            csrf_enabled: default_csrf_enabled(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration with the precedence chain: env vars > file > defaults.
    ///
    /// If `path` is `Some`, reads that file. Otherwise looks for
    /// `warbler.toml` in the current directory, falling back to compiled
    /// defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new("warbler.toml").exists() => Self::from_file("warbler.toml")?,
            None => Config::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Apply env overrides through `lookup` so tests don't touch the process env.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(listen) = lookup("WARBLER_LISTEN") {
            self.server.listen = listen;
        }
        if let Some(key) = lookup("WARBLER_SECRET_KEY") {
            self.auth.secret_key = key;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            let path = url.strip_prefix("sqlite://").unwrap_or(&url);
            self.database.path = expand_tilde(path).into_owned();
        }
    }

    /// Settings for in-process tests: in-memory database, CSRF off.
    pub fn for_tests() -> Self {
        let mut config = Config::default();
        config.database.path = ":memory:".to_string();
        config.auth.csrf_enabled = false;
        config.auth.secret_key = "test-secret".to_string();
        config
    }
}
