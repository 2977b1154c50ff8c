use log::debug;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::process_handle::{Commander, ProcessHandle};
use super::types::OutputStream;
use crate::error_handling::types::PipeError;

/// Launches the administrative executable.
///
/// `run` returns as soon as the process exists; launch failures come back
/// synchronously. The returned handle is bound to a child of `ctx`, so
/// cancelling `ctx` kills the process.
pub trait Piper: Send + Sync {
    fn run(
        &self,
        ctx: &CancellationToken,
        args: &[String],
    ) -> Result<(Arc<dyn Commander>, OutputStream), PipeError>;
}

/// [`Piper`] bound to one executable on disk.
#[derive(Debug, Clone)]
pub struct RacPipe {
    path: PathBuf,
}

impl RacPipe {
    /// Fails with [`PipeError::ExecutableNotFound`] when `path` does not exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, PipeError> {
        let path = path.into();
        if !path.exists() {
            return Err(PipeError::ExecutableNotFound(path.display().to_string()));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Piper for RacPipe {
    fn run(
        &self,
        ctx: &CancellationToken,
        args: &[String],
    ) -> Result<(Arc<dyn Commander>, OutputStream), PipeError> {
        if ctx.is_cancelled() {
            return Err(PipeError::Cancelled);
        }

        let program = self.path.display().to_string();
        debug!("Running {} {}", program, redact_args(args).join(" "));

        let mut cmd = Command::new(&self.path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(PipeError::Spawn)?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.start_kill();
                return Err(PipeError::StreamUnavailable);
            }
        };
        let stderr = child.stderr.take();

        let handle = ProcessHandle::new(program, child, stderr, ctx.child_token());
        Ok((Arc::new(handle), Box::new(stdout)))
    }
}

/// Masks password values so argument vectors can be logged.
pub fn redact_args(args: &[String]) -> Vec<String> {
    const SECRET_FLAGS: [&str; 2] = ["--cluster-pwd=", "--infobase-pwd="];

    let mut redacted = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for arg in args {
        if hide_next {
            redacted.push("***".to_string());
            hide_next = false;
            continue;
        }
        match SECRET_FLAGS.iter().find(|flag| arg.starts_with(*flag)) {
            Some(flag) => redacted.push(format!("{}***", flag)),
            None => {
                hide_next = arg.eq_ignore_ascii_case("/P");
                redacted.push(arg.clone());
            }
        }
    }
    redacted
}
