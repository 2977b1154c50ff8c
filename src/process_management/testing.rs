//! In-memory [`Piper`] for tests that must not spawn real processes.

use async_trait::async_trait;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use super::process_handle::Commander;
use super::process_runner::Piper;
use super::types::OutputStream;
use crate::error_handling::types::PipeError;

pub struct FakePiper {
    output: Vec<u8>,
    stream: Mutex<Option<OutputStream>>,
    exit_code: i32,
    hang: bool,
    spawn_failure: bool,
    fail_on: Option<String>,
    calls: Mutex<Vec<Vec<String>>>,
    cancels: Arc<AtomicUsize>,
}

impl FakePiper {
    pub fn with_output(output: impl AsRef<[u8]>) -> Self {
        Self {
            output: output.as_ref().to_vec(),
            stream: Mutex::new(None),
            exit_code: 0,
            hang: false,
            spawn_failure: false,
            fail_on: None,
            calls: Mutex::new(Vec::new()),
            cancels: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Serves `stream` instead of the canned output on the next run.
    pub fn with_stream(stream: OutputStream) -> Self {
        let piper = Self::with_output("");
        *piper.stream.lock().unwrap() = Some(stream);
        piper
    }

    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// The process never exits on its own.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn spawn_failure(mut self) -> Self {
        self.spawn_failure = true;
        self
    }

    /// Runs whose argument vector contains `arg` exit with code 1.
    pub fn failing_on(mut self, arg: &str) -> Self {
        self.fail_on = Some(arg.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl Piper for FakePiper {
    fn run(
        &self,
        ctx: &CancellationToken,
        args: &[String],
    ) -> Result<(Arc<dyn Commander>, OutputStream), PipeError> {
        if ctx.is_cancelled() {
            return Err(PipeError::Cancelled);
        }
        if self.spawn_failure {
            return Err(PipeError::ExecutableNotFound("fake".to_string()));
        }
        self.calls.lock().unwrap().push(args.to_vec());

        let exit_code = match &self.fail_on {
            Some(arg) if args.contains(arg) => 1,
            _ => self.exit_code,
        };

        let handle = FakeCommander {
            token: ctx.child_token(),
            started: AtomicBool::new(false),
            exit_code,
            hang: self.hang,
            cancels: self.cancels.clone(),
        };
        let stream = match self.stream.lock().unwrap().take() {
            Some(stream) => stream,
            None => Box::new(Cursor::new(self.output.clone())),
        };
        Ok((Arc::new(handle), stream))
    }
}

struct FakeCommander {
    token: CancellationToken,
    started: AtomicBool,
    exit_code: i32,
    hang: bool,
    cancels: Arc<AtomicUsize>,
}

#[async_trait]
impl Commander for FakeCommander {
    fn start(&self) -> Result<(), PipeError> {
        if self.token.is_cancelled() || self.started.swap(true, Ordering::SeqCst) {
            return Err(PipeError::Start("fake".to_string()));
        }
        Ok(())
    }

    async fn wait(&self) -> Result<(), PipeError> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(PipeError::Start("fake: not started".to_string()));
        }
        if self.hang {
            self.token.cancelled().await;
            return Err(PipeError::Cancelled);
        }
        if self.exit_code == 0 {
            Ok(())
        } else {
            Err(PipeError::Exit {
                code: Some(self.exit_code),
                stderr: "fake failure".to_string(),
            })
        }
    }

    fn cancel(&self) -> Result<(), PipeError> {
        self.token.cancel();
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
