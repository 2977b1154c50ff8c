use log::{debug, trace, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::types::CollectPhase;
use crate::entity::{is_blank, unmarshal, Record};
use crate::error_handling::types::{CtrlError, PipeError, UnmarshalError};
use crate::process_management::{Commander, OutputStream, Piper};

/// Cancels the process handle when dropped, whatever the exit path.
struct CancelOnDrop {
    handle: Arc<dyn Commander>,
    operation: &'static str,
}

impl CancelOnDrop {
    fn new(handle: Arc<dyn Commander>, operation: &'static str) -> Self {
        Self { handle, operation }
    }

    fn cancel(&self) {
        if let Err(e) = self.handle.cancel() {
            trace!("{} - cancel failed: {}", self.operation, e);
        }
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct PhaseLog {
    operation: &'static str,
    phase: CollectPhase,
}

impl PhaseLog {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            phase: CollectPhase::Created,
        }
    }

    fn enter(&mut self, next: CollectPhase) {
        trace!("{} - {:?} -> {:?}", self.operation, self.phase, next);
        self.phase = next;
    }
}

fn run_error(operation: &'static str, source: PipeError) -> CtrlError {
    match source {
        PipeError::Cancelled => CtrlError::Cancelled { operation },
        source => CtrlError::Spawn { operation, source },
    }
}

fn wait_error(operation: &'static str, source: PipeError) -> CtrlError {
    match source {
        PipeError::Cancelled => CtrlError::Cancelled { operation },
        source => CtrlError::Wait { operation, source },
    }
}

/// Runs the tool and collects every record block of its output as `R`.
///
/// Records come back in the order the tool printed them. Any fatal error
/// (launch, non-zero exit, read or decode failure, cancellation of `ctx`)
/// discards the records gathered so far and only the error is returned.
pub async fn collect<R: Record>(
    piper: &dyn Piper,
    ctx: &CancellationToken,
    operation: &'static str,
    args: &[String],
) -> Result<Vec<R>, CtrlError> {
    let mut phase = PhaseLog::new(operation);

    let (handle, stdout) = match piper.run(ctx, args) {
        Ok(pair) => pair,
        Err(source) => {
            phase.enter(CollectPhase::Failed);
            return Err(run_error(operation, source));
        }
    };
    let guard = CancelOnDrop::new(handle.clone(), operation);

    if let Err(source) = handle.start() {
        phase.enter(CollectPhase::Failed);
        return Err(CtrlError::Start { operation, source });
    }
    phase.enter(CollectPhase::Started);

    let (record_tx, mut record_rx) = mpsc::channel::<R>(1);
    let (err_tx, mut err_rx) = mpsc::channel::<CtrlError>(1);
    let (done_tx, mut done_rx) = oneshot::channel::<()>();

    let reader = tokio::spawn(read_blocks(stdout, operation, record_tx, err_tx.clone()));

    let waiter_handle = handle.clone();
    let waiter = tokio::spawn(async move {
        if let Err(source) = waiter_handle.wait().await {
            let _ = err_tx.send(wait_error(operation, source)).await;
        }
        let _ = done_tx.send(());
    });

    phase.enter(CollectPhase::Streaming);

    let mut records = Vec::new();
    let mut fatal: Option<CtrlError> = None;
    let mut reader_done = false;
    let mut waiter_done = false;

    while !(waiter_done && (reader_done || fatal.is_some())) {
        tokio::select! {
            biased;

            _ = ctx.cancelled(), if fatal.is_none() => {
                debug!("{} - cancelled by caller", operation);
                guard.cancel();
                fatal = Some(CtrlError::Cancelled { operation });
            }
            Some(err) = err_rx.recv() => {
                if fatal.is_none() {
                    guard.cancel();
                    fatal = Some(err);
                } else {
                    trace!("{} - suppressed after fatal error: {}", operation, err);
                }
            }
            received = record_rx.recv(), if !reader_done => match received {
                Some(record) if fatal.is_none() => records.push(record),
                Some(_) => {}
                None => reader_done = true,
            },
            _ = &mut done_rx, if !waiter_done => {
                waiter_done = true;
                if !reader_done && fatal.is_none() {
                    phase.enter(CollectPhase::Draining);
                }
            }
            else => break,
        }
    }

    reader.abort();
    waiter.abort();
    drop(guard);

    if let Some(err) = fatal {
        phase.enter(CollectPhase::Failed);
        warn!("{} - discarding {} record(s): {}", operation, records.len(), err);
        return Err(err);
    }

    records.shrink_to_fit();
    phase.enter(CollectPhase::Done);
    debug!("{} - collected {} {} record(s)", operation, records.len(), R::KIND);
    Ok(records)
}

/// Sole producer of records: splits the stream into blank-line separated
/// blocks and unmarshals each one.
async fn read_blocks<R: Record>(
    stdout: OutputStream,
    operation: &'static str,
    records: mpsc::Sender<R>,
    errors: mpsc::Sender<CtrlError>,
) {
    let mut reader = BufReader::new(stdout);
    let mut block: Vec<Vec<u8>> = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        let eof = match reader.read_until(b'\n', &mut line).await {
            Ok(n) => n == 0,
            Err(source) => {
                let _ = errors.send(CtrlError::StreamRead { operation, source }).await;
                return;
            }
        };

        if !eof && !is_blank(&line) {
            block.push(std::mem::take(&mut line));
            continue;
        }

        if !block.is_empty() {
            match unmarshal::<R, _>(&block) {
                Ok(record) => {
                    if records.send(record).await.is_err() {
                        return;
                    }
                }
                Err(UnmarshalError::NotFound) => {
                    debug!("{} - skipping block without {} fields", operation, R::KIND)
                }
                Err(source) => {
                    let _ = errors.send(CtrlError::Decode { operation, source }).await;
                    return;
                }
            }
            block.clear();
        }

        if eof {
            return;
        }
    }
}

/// Runs a command whose output is not needed and reports its exit status.
pub async fn execute(
    piper: &dyn Piper,
    ctx: &CancellationToken,
    operation: &'static str,
    args: &[String],
) -> Result<(), CtrlError> {
    let (handle, mut stdout) = piper.run(ctx, args).map_err(|e| run_error(operation, e))?;
    let _guard = CancelOnDrop::new(handle.clone(), operation);

    handle
        .start()
        .map_err(|source| CtrlError::Start { operation, source })?;

    let mut sink = tokio::io::sink();
    let drain = tokio::io::copy(&mut stdout, &mut sink);
    let (drained, waited) = tokio::join!(drain, handle.wait());

    waited.map_err(|e| wait_error(operation, e))?;
    drained.map_err(|source| CtrlError::StreamRead { operation, source })?;

    debug!("{} - done", operation);
    Ok(())
}
