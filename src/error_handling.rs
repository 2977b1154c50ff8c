//! Error types shared across the crate.
//!
//! Each subsystem owns one enum; conversions between layers keep the name of
//! the failing operation so the outermost log line points at the stage that
//! broke.

pub mod types;

pub use types::{
    BackupError, CacheError, ConfigError, CtrlError, PipeError, ServiceError, UnmarshalError,
    WebError,
};
