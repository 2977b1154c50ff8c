//! Cluster control subsystem.
//!
//! Drives the administrative tool to list and mutate clusters, infobases,
//! sessions and connections. List operations stream the tool output through
//! [`result_collector::collect`]; bulk deletes fan out through
//! [`bulk_mutator::delete_many`] with bounded concurrency.
//!
//! Re-exports:
//! - [`ClusterControl`]: the operations seam used by the service layer.
//! - [`ClusterController`]: implementation on top of a [`crate::process_management::Piper`].
//!
//! Example (non-running):
//! ```ignore
//! use std::sync::Arc;
//! use racctl::cluster_control::{ClusterControl, ClusterController};
//! use racctl::process_management::RacPipe;
//! use tokio_util::sync::CancellationToken;
//!
//! let ctrl = ClusterController::new(Arc::new(RacPipe::new("/opt/1cv8/x86_64/current/rac")?));
//! let clusters = ctrl.clusters(&CancellationToken::new(), "localhost:1545").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod bulk_mutator;
pub mod cluster_controller;
pub mod command_args;
pub mod result_collector;
pub mod types;

pub use cluster_controller::{ClusterControl, ClusterController};
pub use types::{CollectPhase, DEFAULT_DELETE_LIMIT};
