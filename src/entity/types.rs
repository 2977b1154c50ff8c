use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cluster registered on the central server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub host: String,
    pub port: String,
    pub name: String,
    pub expiration_timeout: i64,
    pub lifetime_limit: i64,
    pub max_memory_size: i64,
    pub max_memory_time_limit: i64,
    pub security_level: i64,
    pub session_fault_tolerance_level: i64,
    pub load_balancing_mode: i64,
    pub errors_count_threshold: i64,
    pub kill_problem_processes: i64,
}

impl Cluster {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// An infobase as reported by `infobase summary list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Infobase {
    pub id: String,
    pub name: String,
    pub desc: String,
}

impl Infobase {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Snapshot of one user session with its telemetry counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub session_id: i64,
    pub infobase_id: String,
    pub connection_id: String,
    pub process_id: String,
    pub user_name: String,
    pub host: String,
    pub app_id: String,
    pub locale: String,
    pub started_at: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub hibernate: String,
    pub passive_session_hibernate_time: i64,
    pub hibernate_session_terminate_time: i64,
    pub blocked_by_dbms: i64,
    pub blocked_by_ls: i64,
    pub bytes_all: i64,
    pub bytes_last_5min: i64,
    pub calls_all: i64,
    pub calls_last_5min: i64,
    pub dbms_bytes_all: i64,
    pub dbms_bytes_last_5min: i64,
    pub db_proc_info: String,
    pub db_proc_took: i64,
    pub db_proc_took_at: Option<DateTime<Utc>>,
    pub duration_all: i64,
    pub duration_all_dbms: i64,
    pub duration_current: i64,
    pub duration_current_dbms: i64,
    pub duration_last_5min: i64,
    pub duration_last_5min_dbms: i64,
    pub memory_current: i64,
    pub memory_last_5min: i64,
    pub memory_total: i64,
    pub read_current: i64,
    pub read_last_5min: i64,
    pub read_total: i64,
    pub write_current: i64,
    pub write_last_5min: i64,
    pub write_total: i64,
    pub duration_current_service: i64,
    pub duration_last_5min_service: i64,
    pub duration_all_service: i64,
    pub current_service_name: String,
    pub cpu_time_current: i64,
    pub cpu_time_last_5min: i64,
    pub cpu_time_total: i64,
    pub data_separation: String,
    pub client_ip: String,
}

impl Session {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A client connection to a working process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: String,
    pub conn_id: i64,
    pub infobase_id: String,
    pub process_id: String,
    pub host: String,
    pub app_id: String,
    pub connected_at: Option<DateTime<Utc>>,
    pub session_number: i64,
    pub blocked_by_ls: i64,
}

impl Connection {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// Login and password for a cluster or infobase administrator.
///
/// The password is never serialized and is masked in `Debug` output.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Credentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.password.is_empty()
    }

    /// Turns an all-empty pair into `None`.
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("name", &self.name)
            .field("password", &"***")
            .finish()
    }
}
