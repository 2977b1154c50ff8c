use serde::{Deserialize, Serialize};

use crate::cluster_control::DEFAULT_DELETE_LIMIT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the `rac` cluster administration client.
    pub path_to_rac: String,
    /// Path to the platform client used for designer dumps.
    pub path_to_1c: String,
    /// Permission code that lets the backup through the session lock.
    pub lock_code: String,
    #[serde(default = "default_delete_limit")]
    pub max_concurrent_deletes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,
    #[serde(default = "default_backup_timeout")]
    pub backup_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub level: String,
}

fn default_delete_limit() -> usize {
    DEFAULT_DELETE_LIMIT
}

fn default_list_timeout() -> u64 {
    5
}

fn default_backup_timeout() -> u64 {
    60 * 60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            path_to_rac: "/opt/1cv8/x86_64/current/rac".to_string(),
            path_to_1c: "/opt/1cv8/x86_64/current/1cv8".to_string(),
            lock_code: "racctl".to_string(),
            max_concurrent_deletes: default_delete_limit(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 60 }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            list_timeout_secs: default_list_timeout(),
            backup_timeout_secs: default_backup_timeout(),
        }
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
