use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    NotInRange(String),
    ExecutableMissing(String),
    AlreadyExists(PathBuf),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::ExecutableMissing(e) => write!(f, "Executable not configured: {}", e),
            ConfigError::AlreadyExists(p) => {
                write!(f, "Configuration file already exists: {}", p.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures of the process runner and of a single process handle.
#[derive(Debug)]
pub enum PipeError {
    ExecutableNotFound(String),
    Spawn(std::io::Error),
    StreamUnavailable,
    Start(String),
    Exit { code: Option<i32>, stderr: String },
    Wait(std::io::Error),
    Cancelled,
}

impl fmt::Display for PipeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipeError::ExecutableNotFound(p) => write!(f, "file does not exist: {}", p),
            PipeError::Spawn(e) => write!(f, "spawn failed: {}", e),
            PipeError::StreamUnavailable => write!(f, "stdout pipe not available"),
            PipeError::Start(e) => write!(f, "start failed: {}", e),
            PipeError::Exit { code, stderr } => {
                match code {
                    Some(c) => write!(f, "process exited with code {}", c)?,
                    None => write!(f, "process terminated by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            PipeError::Wait(e) => write!(f, "wait failed: {}", e),
            PipeError::Cancelled => write!(f, "process cancelled"),
        }
    }
}

impl std::error::Error for PipeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipeError::Spawn(e) | PipeError::Wait(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum UnmarshalError {
    /// The block carried no field of the target record.
    NotFound,
    /// The identifying key appeared twice: two records without a separator.
    DuplicateKey(String),
}

impl fmt::Display for UnmarshalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmarshalError::NotFound => write!(f, "key not found"),
            UnmarshalError::DuplicateKey(k) => write!(f, "duplicate key {} in one block", k),
        }
    }
}

impl std::error::Error for UnmarshalError {}

/// Errors of the cluster control layer. Every variant produced while talking to
/// the administrative tool carries the name of the failing operation.
#[derive(Debug)]
pub enum CtrlError {
    Spawn {
        operation: &'static str,
        source: PipeError,
    },
    Start {
        operation: &'static str,
        source: PipeError,
    },
    Wait {
        operation: &'static str,
        source: PipeError,
    },
    StreamRead {
        operation: &'static str,
        source: std::io::Error,
    },
    Decode {
        operation: &'static str,
        source: UnmarshalError,
    },
    Cancelled {
        operation: &'static str,
    },
    TaskFailed {
        operation: &'static str,
        reason: String,
    },
    InfobaseRequired,
    SessionRequired,
    ConnectionRequired,
    Aggregate(Vec<CtrlError>),
}

impl fmt::Display for CtrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CtrlError::Spawn { operation, source } => {
                write!(f, "ctrlpipe - {} - error opening pipe: {}", operation, source)
            }
            CtrlError::Start { operation, source } => {
                write!(f, "ctrlpipe - {} - error starting command: {}", operation, source)
            }
            CtrlError::Wait { operation, source } => {
                write!(f, "ctrlpipe - {} - error waiting command: {}", operation, source)
            }
            CtrlError::StreamRead { operation, source } => {
                write!(f, "ctrlpipe - {} - error reading pipe: {}", operation, source)
            }
            CtrlError::Decode { operation, source } => {
                write!(f, "ctrlpipe - {} - error parsing block: {}", operation, source)
            }
            CtrlError::Cancelled { operation } => {
                write!(f, "ctrlpipe - {} - cancelled", operation)
            }
            CtrlError::TaskFailed { operation, reason } => {
                write!(f, "ctrlpipe - {} - task failed: {}", operation, reason)
            }
            CtrlError::InfobaseRequired => write!(f, "infobase is required"),
            CtrlError::SessionRequired => write!(f, "session is required"),
            CtrlError::ConnectionRequired => write!(f, "connection is required"),
            CtrlError::Aggregate(errors) => {
                write!(f, "{} operation(s) failed", errors.len())?;
                for e in errors {
                    write!(f, "; {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CtrlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CtrlError::Spawn { source, .. }
            | CtrlError::Start { source, .. }
            | CtrlError::Wait { source, .. } => Some(source),
            CtrlError::StreamRead { source, .. } => Some(source),
            CtrlError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum CacheError {
    Poisoned,
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Poisoned => write!(f, "cache lock poisoned"),
        }
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug)]
pub enum BackupError {
    IncompleteTarget(String),
    Failed(CtrlError),
    MissingOutput(PathBuf),
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupError::IncompleteTarget(e) => write!(f, "backup target incomplete: {}", e),
            BackupError::Failed(e) => write!(f, "backup failed: {}", e),
            BackupError::MissingOutput(p) => {
                write!(f, "backup file does not exist at: {}", p.display())
            }
        }
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackupError::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CtrlError> for BackupError {
    fn from(err: CtrlError) -> Self {
        BackupError::Failed(err)
    }
}

#[derive(Debug)]
pub enum ServiceError {
    Cache {
        operation: &'static str,
        source: CacheError,
    },
    Control {
        operation: &'static str,
        source: CtrlError,
    },
    Backup(BackupError),
    NotFound(String),
    Timeout(&'static str),
    Workflow(Vec<ServiceError>),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Cache { operation, source } => {
                write!(f, "ControlService - {} - cache: {}", operation, source)
            }
            ServiceError::Control { operation, source } => {
                write!(f, "ControlService - {} - pipe: {}", operation, source)
            }
            ServiceError::Backup(e) => write!(f, "ControlService - backup: {}", e),
            ServiceError::NotFound(e) => write!(f, "ControlService - not found: {}", e),
            ServiceError::Timeout(op) => write!(f, "ControlService - {} - timed out", op),
            ServiceError::Workflow(errors) => {
                write!(f, "ControlService - workflow: {} step(s) failed", errors.len())?;
                for e in errors {
                    write!(f, "; {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Cache { source, .. } => Some(source),
            ServiceError::Control { source, .. } => Some(source),
            ServiceError::Backup(e) => Some(e),
            _ => None,
        }
    }
}

impl From<BackupError> for ServiceError {
    fn from(err: BackupError) -> Self {
        ServiceError::Backup(err)
    }
}

/// Failures of an HTTP call. Request errors map to 400, the rest to 500.
#[derive(Debug)]
pub enum WebError {
    MissingEntrypoint,
    InvalidFlag { name: &'static str, value: String },
    Service(ServiceError),
    Timeout(&'static str),
}

impl WebError {
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            WebError::MissingEntrypoint | WebError::InvalidFlag { .. }
        )
    }
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::MissingEntrypoint => write!(f, "query parameter entrypoint is required"),
            WebError::InvalidFlag { name, value } => {
                write!(f, "query parameter {} is not a boolean: {:?}", name, value)
            }
            WebError::Service(e) => write!(f, "{}", e),
            WebError::Timeout(op) => write!(f, "http - {} - timed out", op),
        }
    }
}

impl std::error::Error for WebError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WebError::Service(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ServiceError> for WebError {
    fn from(err: ServiceError) -> Self {
        WebError::Service(err)
    }
}
