//! Control service subsystem.
//!
//! Sits between the HTTP/CLI surfaces and the cluster control layer: listings
//! can be served from the cache, fresh results are written back, and the
//! infobase backup workflow is orchestrated here.

pub mod ctrl_service;
#[cfg(test)]
pub mod tests;

pub use ctrl_service::{BackupRequest, ControlService, DEFAULT_BACKUP_TIMEOUT};
