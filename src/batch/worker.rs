use super::item::{ItemStatus, PendingItem, TransitionGuard};
use crate::config::BatchWorkerConfig;
use crate::core::{OccError, RecordKey, Result, VersionedRecord};
use crate::retry::{Committed, RetryController, WriteIntent};
use crate::storage::{Predicate, QueryableStore};
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Side effect run once an item has been claimed.
#[async_trait]
pub trait ItemProcessor<T>: Send + Sync {
    /// An `Err` marks the item `Failed`; it never affects sibling items.
    async fn process(&self, item: &T) -> Result<()>;
}

/// Per-run accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport<K> {
    /// Items that reached `Completed`.
    pub completed: Vec<K>,
    /// Items whose processor failed and were marked `Failed`.
    pub failed: Vec<K>,
    /// Items claimed or deleted by someone else before this worker got to them.
    pub skipped: Vec<K>,
    /// Items left untouched or half-done because of contention or storage errors.
    pub errored: Vec<(K, String)>,
    /// The run stopped early on cancellation.
    pub cancelled: bool,
}

impl<K> Default for BatchReport<K> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
            errored: Vec::new(),
            cancelled: false,
        }
    }
}

impl<K> BatchReport<K> {
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len() + self.skipped.len() + self.errored.len()
    }
}

enum ItemOutcome {
    Completed,
    Failed,
    Skipped(String),
    Errored(String),
    Cancelled,
}

/// Pulls a bounded batch of `Waiting` items and moves each one through
/// `Processing` to `Completed`/`Failed`, one conditional write at a time.
///
/// Items are independent: no shared transaction, and one item's failure is
/// logged and recorded without stopping the rest of the batch.
pub struct BatchWorker<K, T, S: ?Sized, P: ?Sized> {
    store: Arc<S>,
    processor: Arc<P>,
    controller: RetryController,
    config: BatchWorkerConfig,
    _marker: PhantomData<fn() -> (K, T)>,
}

impl<K, T, S, P> BatchWorker<K, T, S, P>
where
    K: RecordKey,
    T: PendingItem,
    S: QueryableStore<K, T> + ?Sized,
    P: ItemProcessor<T> + ?Sized,
{
    pub fn new(
        store: Arc<S>,
        processor: Arc<P>,
        controller: RetryController,
        config: BatchWorkerConfig,
    ) -> Self {
        Self {
            store,
            processor,
            controller,
            config,
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> &BatchWorkerConfig {
        &self.config
    }

    /// One pass over at most `batch_size` eligible items.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<BatchReport<K>> {
        if cancel.is_cancelled() {
            return Err(OccError::Cancelled);
        }

        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.config.min_age_duration())
                .map_err(|err| OccError::InvalidConfig(format!("min_age_ms: {err}")))?;
        let eligible = Predicate::new(move |item: &T| {
            item.status() == ItemStatus::Waiting && item.created_at() <= cutoff
        });
        let batch = self.store.select(&eligible, self.config.batch_size).await?;

        let mut report = BatchReport::default();
        for (key, record) in batch {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            match self.process_item(&key, record, cancel).await {
                ItemOutcome::Completed => report.completed.push(key),
                ItemOutcome::Failed => report.failed.push(key),
                ItemOutcome::Skipped(reason) => {
                    info!("Skipping item '{}': {}", key, reason);
                    report.skipped.push(key);
                }
                ItemOutcome::Errored(reason) => {
                    error!("An error occurred while processing item '{}': {}", key, reason);
                    report.errored.push((key, reason));
                }
                ItemOutcome::Cancelled => {
                    report.cancelled = true;
                    break;
                }
            }
        }

        info!(
            "Batch finished: {} completed, {} failed, {} skipped, {} errored{}",
            report.completed.len(),
            report.failed.len(),
            report.skipped.len(),
            report.errored.len(),
            if report.cancelled { " (cancelled)" } else { "" }
        );
        Ok(report)
    }

    async fn process_item(
        &self,
        key: &K,
        record: VersionedRecord<T>,
        cancel: &CancellationToken,
    ) -> ItemOutcome {
        let claimed = match self
            .transition(key, record, ItemStatus::Waiting, ItemStatus::Processing, cancel)
            .await
        {
            Ok(claimed) => claimed,
            Err(err) => return Self::classify(err),
        };

        let target = match self.processor.process(&claimed.value).await {
            Ok(()) => ItemStatus::Completed,
            Err(err) => {
                warn!("Processor failed for item '{}': {}", key, err);
                ItemStatus::Failed
            }
        };

        // The side effect already ran: its outcome is recorded regardless of
        // cancellation, so no item is left in Processing.
        let finalize = CancellationToken::new();
        match self
            .transition(
                key,
                claimed.into_record(),
                ItemStatus::Processing,
                target,
                &finalize,
            )
            .await
        {
            Ok(_) if target == ItemStatus::Completed => ItemOutcome::Completed,
            Ok(_) => ItemOutcome::Failed,
            Err(err) => ItemOutcome::Errored(format!(
                "processed but could not record {target}: {err}"
            )),
        }
    }

    async fn transition(
        &self,
        key: &K,
        record: VersionedRecord<T>,
        from: ItemStatus,
        to: ItemStatus,
        cancel: &CancellationToken,
    ) -> Result<Committed<T>> {
        let intended = record.value.with_status(to, Utc::now());
        let guard = TransitionGuard::new(from, T::TRANSITION_POLICY);
        self.controller
            .execute(
                &*self.store,
                key,
                WriteIntent::new(record, intended),
                &guard,
                cancel,
            )
            .await
    }

    fn classify(err: OccError) -> ItemOutcome {
        match err {
            OccError::Aborted { reason, .. } => ItemOutcome::Skipped(reason),
            OccError::NotFound(_) => {
                ItemOutcome::Skipped("deleted by another transaction".to_string())
            }
            OccError::Cancelled => ItemOutcome::Cancelled,
            other => ItemOutcome::Errored(other.to_string()),
        }
    }
}
