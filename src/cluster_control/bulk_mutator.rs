use log::{debug, warn};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error_handling::types::CtrlError;

/// Runs `delete` for every item with at most `limit` calls in flight.
///
/// A failing item never stops its siblings. All failures are returned together
/// as [`CtrlError::Aggregate`]; an empty `items` returns immediately.
pub async fn delete_many<T, F, Fut>(
    ctx: &CancellationToken,
    operation: &'static str,
    items: Vec<T>,
    limit: usize,
    delete: F,
) -> Result<(), CtrlError>
where
    T: Send + 'static,
    F: Fn(CancellationToken, T) -> Fut,
    Fut: Future<Output = Result<(), CtrlError>> + Send + 'static,
{
    if items.is_empty() {
        return Ok(());
    }

    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles = Vec::with_capacity(total);
    let mut errors = Vec::new();

    for item in items {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                errors.push(CtrlError::TaskFailed {
                    operation,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let task = delete(ctx.clone(), item);
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            task.await
        }));
    }

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(e),
            Err(e) => errors.push(CtrlError::TaskFailed {
                operation,
                reason: format!("task panicked: {}", e),
            }),
        }
    }

    if errors.is_empty() {
        debug!("{} - {} item(s) done", operation, total);
        return Ok(());
    }

    warn!("{} - {} of {} item(s) failed", operation, errors.len(), total);
    Err(CtrlError::Aggregate(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn empty_input_is_ok_and_runs_nothing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = delete_many(&CancellationToken::new(), "test", Vec::<u32>::new(), 50, move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), CtrlError>(()) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let result = delete_many(&CancellationToken::new(), "test", vec![1, 2, 3], 50, move |_, item| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if item == 2 {
                    Err(CtrlError::SessionRequired)
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(CtrlError::Aggregate(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0], CtrlError::SessionRequired));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn in_flight_calls_respect_the_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (r, p) = (running.clone(), peak.clone());

        let result = delete_many(&CancellationToken::new(), "test", (0..20).collect(), 3, move |_, _: i32| {
            let (running, peak) = (r.clone(), p.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), CtrlError>(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn panicking_item_is_reported() {
        let result = delete_many(&CancellationToken::new(), "test", vec![1, 2], 2, |_, item: i32| async move {
            if item == 1 {
                panic!("boom");
            }
            Ok::<(), CtrlError>(())
        })
        .await;

        match result {
            Err(CtrlError::Aggregate(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(matches!(errors[0], CtrlError::TaskFailed { .. }));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
