//! Process management subsystem.
//!
//! This module launches the external administrative executable and hands back
//! a controllable handle plus its standard output. Arguments always travel as
//! an argument vector, never through a shell.
//!
//! Re-exports:
//! - [`Piper`], [`RacPipe`]: the runner seam and its real implementation.
//! - [`Commander`], [`ProcessHandle`]: start/wait/cancel control of one process.
//! - [`OutputStream`]: the readable end of the process standard output.
//!
//! Example (non-running):
//! ```ignore
//! use racctl::process_management::{Piper, RacPipe};
//! use tokio_util::sync::CancellationToken;
//!
//! let pipe = RacPipe::new("/opt/1cv8/x86_64/current/rac")?;
//! let ctx = CancellationToken::new();
//! let (handle, stdout) = pipe.run(&ctx, &["localhost:1545".into(), "cluster".into(), "list".into()])?;
//! handle.start()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod process_handle;
pub mod process_runner;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use process_handle::{Commander, ProcessHandle};
pub use process_runner::{redact_args, Piper, RacPipe};
pub use types::{HandleState, OutputStream};
