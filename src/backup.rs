//! Infobase backup through the platform client executable.

pub mod backup_runner;

pub use backup_runner::{dump_args, Backup, BackupRunner};
