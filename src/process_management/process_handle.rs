use async_trait::async_trait;
use log::{debug, trace, warn};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::types::HandleState;
use crate::error_handling::types::PipeError;

/// Bytes of standard error kept for error reports.
const STDERR_LIMIT: u64 = 4096;

/// How long a failed process gets to flush its standard error.
const STDERR_GRACE: Duration = Duration::from_secs(1);

/// Control over one launched process.
///
/// `start` and `cancel` never block. `cancel` is idempotent and safe to call
/// after the process has finished; a concurrent `wait` returns
/// [`PipeError::Cancelled`] once the process is killed.
#[async_trait]
pub trait Commander: Send + Sync {
    fn start(&self) -> Result<(), PipeError>;

    async fn wait(&self) -> Result<(), PipeError>;

    fn cancel(&self) -> Result<(), PipeError>;
}

/// [`Commander`] over a `tokio::process::Child`.
pub struct ProcessHandle {
    program: String,
    child: AsyncMutex<Child>,
    cancel: CancellationToken,
    state: Mutex<HandleState>,
    stderr: Mutex<Option<JoinHandle<String>>>,
}

impl ProcessHandle {
    /// Wraps a spawned child. `cancel` should be derived from the caller's
    /// token so that cancelling the caller kills the process.
    pub fn new(
        program: String,
        child: Child,
        stderr: Option<ChildStderr>,
        cancel: CancellationToken,
    ) -> Self {
        let stderr = stderr.map(|s| tokio::spawn(capture_stderr(s)));
        Self {
            program,
            child: AsyncMutex::new(child),
            cancel,
            state: Mutex::new(HandleState::Created),
            stderr: Mutex::new(stderr),
        }
    }

    pub fn state(&self) -> HandleState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn set_state(&self, next: HandleState) {
        match self.state.lock() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    async fn collected_stderr(&self) -> String {
        let task = match self.stderr.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        let Some(task) = task else {
            return String::new();
        };

        match tokio::time::timeout(STDERR_GRACE, task).await {
            Ok(Ok(text)) => text,
            _ => String::new(),
        }
    }
}

#[async_trait]
impl Commander for ProcessHandle {
    fn start(&self) -> Result<(), PipeError> {
        if self.cancel.is_cancelled() {
            return Err(PipeError::Start(format!(
                "{}: cancelled before start",
                self.program
            )));
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| PipeError::Start(format!("{}: state lock poisoned", self.program)))?;
        if *state != HandleState::Created {
            return Err(PipeError::Start(format!("{}: already started", self.program)));
        }
        *state = HandleState::Started;

        debug!("Process {} started", self.program);
        Ok(())
    }

    async fn wait(&self) -> Result<(), PipeError> {
        if self.state() == HandleState::Created {
            return Err(PipeError::Start(format!("{}: not started", self.program)));
        }

        let mut child = self.child.lock().await;

        let outcome = tokio::select! {
            status = child.wait() => Some(status),
            _ = self.cancel.cancelled() => None,
        };

        let Some(status) = outcome else {
            if let Err(e) = child.kill().await {
                trace!("Kill of {} after cancel: {}", self.program, e);
            }
            self.set_state(HandleState::Finished);
            debug!("Process {} cancelled", self.program);
            return Err(PipeError::Cancelled);
        };
        drop(child);
        self.set_state(HandleState::Finished);

        let status = status.map_err(PipeError::Wait)?;
        if status.success() {
            debug!("Process {} exited successfully", self.program);
            return Ok(());
        }

        let stderr = self.collected_stderr().await;
        warn!("Process {} exited with {}", self.program, status);
        Err(PipeError::Exit {
            code: status.code(),
            stderr,
        })
    }

    fn cancel(&self) -> Result<(), PipeError> {
        self.cancel.cancel();

        // Nobody is waiting: kill directly, the orphan reaper collects it.
        if let Ok(mut child) = self.child.try_lock() {
            if let Err(e) = child.start_kill() {
                trace!("Kill of {} skipped: {}", self.program, e);
            }
        }
        Ok(())
    }
}

async fn capture_stderr(mut stderr: ChildStderr) -> String {
    let mut head = Vec::new();
    if let Err(e) = (&mut stderr).take(STDERR_LIMIT).read_to_end(&mut head).await {
        trace!("stderr read failed: {}", e);
    }
    // Keep draining so a chatty process never blocks on a full pipe.
    let _ = tokio::io::copy(&mut stderr, &mut tokio::io::sink()).await;
    String::from_utf8_lossy(&head).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::process_management::process_runner::{Piper, RacPipe};
    use std::time::Instant;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn wait_reports_success() {
        let pipe = RacPipe::new("/bin/sh").unwrap();
        let ctx = CancellationToken::new();

        let (handle, mut stdout) = pipe.run(&ctx, &sh("echo cluster: c1")).unwrap();
        handle.start().unwrap();

        let mut out = String::new();
        stdout.read_to_string(&mut out).await.unwrap();
        handle.wait().await.unwrap();

        assert_eq!(out, "cluster: c1\n");
    }

    #[tokio::test]
    async fn wait_reports_exit_code_and_stderr() {
        let pipe = RacPipe::new("/bin/sh").unwrap();
        let ctx = CancellationToken::new();

        let (handle, _stdout) = pipe.run(&ctx, &sh("echo boom >&2; exit 3")).unwrap();
        handle.start().unwrap();

        match handle.wait().await {
            Err(PipeError::Exit { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn start_twice_fails() {
        let pipe = RacPipe::new("/bin/sh").unwrap();
        let ctx = CancellationToken::new();

        let (handle, _stdout) = pipe.run(&ctx, &sh("true")).unwrap();
        handle.start().unwrap();

        assert!(matches!(handle.start(), Err(PipeError::Start(_))));
        handle.wait().await.unwrap();
    }

    #[tokio::test]
    async fn wait_before_start_fails() {
        let pipe = RacPipe::new("/bin/sh").unwrap();
        let ctx = CancellationToken::new();

        let (handle, _stdout) = pipe.run(&ctx, &sh("true")).unwrap();

        assert!(matches!(handle.wait().await, Err(PipeError::Start(_))));
        handle.cancel().unwrap();
    }

    #[tokio::test]
    async fn caller_cancel_kills_the_process() {
        let pipe = RacPipe::new("/bin/sh").unwrap();
        let ctx = CancellationToken::new();

        let (handle, _stdout) = pipe.run(&ctx, &sh("exec sleep 30")).unwrap();
        handle.start().unwrap();

        let started = Instant::now();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        assert!(matches!(handle.wait().await, Err(PipeError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn cancel_is_idempotent() {
        let pipe = RacPipe::new("/bin/sh").unwrap();
        let ctx = CancellationToken::new();

        let (handle, _stdout) = pipe.run(&ctx, &sh("true")).unwrap();
        handle.start().unwrap();
        handle.wait().await.unwrap();

        handle.cancel().unwrap();
        handle.cancel().unwrap();
        assert!(!ctx.is_cancelled());
    }
}
