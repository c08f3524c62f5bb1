use super::item::PendingItem;
use super::worker::{BatchWorker, ItemProcessor};
use crate::core::{OccError, RecordKey, Result};
use crate::storage::QueryableStore;
use log::{error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Duration as TokioDuration, sleep};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Handle to a background batch loop.
pub struct BatchWorkerHandle {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    runs: Arc<AtomicU64>,
    join_handle: Option<JoinHandle<()>>,
}

impl BatchWorkerHandle {
    /// Requests an immediate run without waiting for the next tick.
    pub fn trigger(&self) {
        self.trigger.notify_one();
    }

    /// Number of finished runs so far, including runs that returned an error.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Acquire)
    }

    /// Signals the worker to stop (cancelling an in-flight batch) and waits for it.
    pub async fn stop(mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| OccError::Processing(format!("batch worker join: {}", err)))?;
        }
        Ok(())
    }
}

impl Drop for BatchWorkerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawns a loop running `worker` every `interval` or when triggered.
///
/// A failed run is logged and the loop keeps its cadence.
pub fn spawn_batch_worker<K, T, S, P>(
    worker: Arc<BatchWorker<K, T, S, P>>,
    interval: TokioDuration,
) -> BatchWorkerHandle
where
    K: RecordKey,
    T: PendingItem,
    S: QueryableStore<K, T> + ?Sized + 'static,
    P: ItemProcessor<T> + ?Sized + 'static,
{
    let cancel = CancellationToken::new();
    let trigger = Arc::new(Notify::new());
    let runs = Arc::new(AtomicU64::new(0));

    let loop_cancel = cancel.clone();
    let loop_trigger = Arc::clone(&trigger);
    let loop_runs = Arc::clone(&runs);
    let interval = interval.max(TokioDuration::from_millis(10));

    let join_handle = tokio::spawn(async move {
        info!("Batch worker started (interval={}ms)", interval.as_millis());
        loop {
            tokio::select! {
                _ = loop_cancel.cancelled() => {
                    break;
                }
                _ = sleep(interval) => {}
                _ = loop_trigger.notified() => {}
            }

            let run = loop_runs.load(Ordering::Acquire) + 1;
            let span = tracing::info_span!("batch_run", run);
            match worker.run_once(&loop_cancel).instrument(span).await {
                Ok(_) => {}
                Err(OccError::Cancelled) => break,
                Err(err) => error!("An error occurred while processing the batch: {}", err),
            }
            loop_runs.fetch_add(1, Ordering::AcqRel);
        }
        info!("Batch worker stopped");
    });

    BatchWorkerHandle {
        cancel,
        trigger,
        runs,
        join_handle: Some(join_handle),
    }
}
