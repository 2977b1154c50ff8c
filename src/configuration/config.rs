use super::types::*;
use crate::error_handling::types::ConfigError;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variables that take precedence over the file.
pub const ENV_PATH_TO_RAC: &str = "PATH_TO_RAC";
pub const ENV_PATH_TO_1C: &str = "PATH_TO_1C";
pub const ENV_HTTP_PORT: &str = "HTTP_PORT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

const MAX_DELETE_LIMIT: usize = 1000;

/// Application configuration, read from a TOML file.
///
/// ```toml
/// [app]
/// path_to_rac = "/opt/1cv8/x86_64/8.3.24.1467/rac"
/// path_to_1c = "/opt/1cv8/x86_64/8.3.24.1467/1cv8"
/// lock_code = "backup"
///
/// [cache]
/// ttl_secs = 60
///
/// [http]
/// port = 8080
///
/// [logger]
/// level = "info"
/// ```
///
/// `max_concurrent_deletes`, `list_timeout_secs` and `backup_timeout_secs`
/// are optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub logger: LoggerConfig,
}

impl Config {
    /// Reads, overrides from the process environment, and validates.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    /// Writes a default configuration to `path`. An existing file is left alone.
    pub fn prepare(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        let config = Self::default();
        let raw = toml::to_string_pretty(&config).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, raw)?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_PATH_TO_RAC) {
            self.app.path_to_rac = v;
        }
        if let Some(v) = lookup(ENV_PATH_TO_1C) {
            self.app.path_to_1c = v;
        }
        if let Some(v) = lookup(ENV_HTTP_PORT) {
            self.http.port = v
                .parse()
                .map_err(|_| ConfigError::NotInRange(format!("{}={} is not a port", ENV_HTTP_PORT, v)))?;
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            self.logger.level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.path_to_rac.trim().is_empty() {
            return Err(ConfigError::ExecutableMissing("app.path_to_rac".to_string()));
        }
        if self.app.path_to_1c.trim().is_empty() {
            return Err(ConfigError::ExecutableMissing("app.path_to_1c".to_string()));
        }
        if self.app.lock_code.is_empty() {
            return Err(ConfigError::NotInRange(
                "app.lock_code must not be empty".to_string(),
            ));
        }
        if !(1..=MAX_DELETE_LIMIT).contains(&self.app.max_concurrent_deletes) {
            return Err(ConfigError::NotInRange(format!(
                "app.max_concurrent_deletes must be within 1..={}",
                MAX_DELETE_LIMIT
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::NotInRange(
                "cache.ttl_secs must be positive".to_string(),
            ));
        }
        if self.http.port == 0 {
            return Err(ConfigError::NotInRange("http.port must not be 0".to_string()));
        }
        if self.http.list_timeout_secs == 0 || self.http.backup_timeout_secs == 0 {
            return Err(ConfigError::NotInRange(
                "http timeouts must be positive".to_string(),
            ));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        self.logger.level.parse().map_err(|_| {
            ConfigError::NotInRange(format!("logger.level: unknown level {}", self.logger.level))
        })
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.http.list_timeout_secs)
    }

    pub fn backup_timeout(&self) -> Duration {
        Duration::from_secs(self.http.backup_timeout_secs)
    }
}
