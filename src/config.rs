//! Service configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! environment variables. Command-line flags are applied last by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{BoardError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    /// Default tracing filter; `RUST_LOG` takes precedence when set.
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    /// How long a write waits for another writer's lock, in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("laneboard.db"),
            busy_timeout_ms: 5_000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string to bind to
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Config {
    pub const ENV_DATABASE: &'static str = "LANEBOARD_DATABASE";
    /// Fallback for [`Config::ENV_DATABASE`]; a `sqlite:` scheme is stripped
    pub const ENV_DATABASE_URL: &'static str = "DATABASE_URL";
    pub const ENV_BIND: &'static str = "LANEBOARD_BIND";
    pub const ENV_PORT: &'static str = "PORT";
    pub const ENV_LOG: &'static str = "LANEBOARD_LOG";

    /// Parses a TOML document; missing keys keep their defaults
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| BoardError::ConfigError(e.to_string()))
    }

    /// Loads the file at `path` if given, then applies environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    BoardError::ConfigError(format!("{}: {e}", path.display()))
                })?;
                Self::from_toml(&contents)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from a key lookup, normally the process environment
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(Self::ENV_DATABASE) {
            self.database.path = PathBuf::from(path);
        } else if let Some(url) = lookup(Self::ENV_DATABASE_URL) {
            self.database.path = database_path_from_url(&url)?;
        }
        if let Some(bind) = lookup(Self::ENV_BIND) {
            self.server.bind_addr = bind;
        }
        if let Some(port) = lookup(Self::ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| BoardError::ConfigError(format!("invalid {}: {port}", Self::ENV_PORT)))?;
        }
        if let Some(level) = lookup(Self::ENV_LOG) {
            self.log_level = level;
        }
        Ok(())
    }
}

/// Accepts a bare path, `sqlite:path` or `sqlite://path`
fn database_path_from_url(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    if path.is_empty() || path.contains("://") {
        return Err(BoardError::ConfigError(format!(
            "unsupported {}: {url}",
            Config::ENV_DATABASE_URL
        )));
    }
    Ok(PathBuf::from(path))
}
