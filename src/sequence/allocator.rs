use super::counter::{DocumentNumber, PartitionKey, SequenceCounter};
use crate::conflict::AcceptRemoteIncrement;
use crate::core::{OccError, Result, Sequenced, VersionedRecord};
use crate::retry::{RetryController, WriteIntent};
use crate::storage::{CreateOutcome, VersionedStore};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Hands out unique, gapless sequence numbers per partition key.
///
/// Holds no counter state of its own: every number comes from a committed
/// conditional write on the counter record, so correctness holds across
/// processes sharing the store.
pub struct SequenceAllocator<S: ?Sized> {
    store: Arc<S>,
    controller: RetryController,
}

impl<S: ?Sized> Clone for SequenceAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            controller: self.controller.clone(),
        }
    }
}

impl<S> SequenceAllocator<S>
where
    S: VersionedStore<PartitionKey, SequenceCounter> + ?Sized,
{
    pub fn new(store: Arc<S>, controller: RetryController) -> Self {
        Self { store, controller }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Claims the next number for `key`.
    ///
    /// A first caller creates the counter at 1. A caller losing that race
    /// observes `AlreadyExists` and continues on the increment path. Failed
    /// allocations commit nothing, so they never burn a number.
    pub async fn allocate(&self, key: &PartitionKey, cancel: &CancellationToken) -> Result<i64> {
        Self::ensure_active(cancel)?;

        let current = match self.store.read(key).await? {
            Some(current) => current,
            None => {
                Self::ensure_active(cancel)?;
                match self.store.create(key, SequenceCounter::first(key)).await? {
                    CreateOutcome::Created(_) => {
                        info!("Created sequence counter for '{}'", key);
                        return Ok(1);
                    }
                    CreateOutcome::AlreadyExists => {
                        debug!("Sequence counter for '{}' created concurrently; re-reading", key);
                        Self::ensure_active(cancel)?;
                        self.store.read(key).await?.ok_or_else(|| OccError::AllocationFailed {
                            key: key.to_string(),
                            reason: "counter vanished after a concurrent create".to_string(),
                        })?
                    }
                }
            }
        };

        self.advance(key, current, cancel).await
    }

    /// Claims the next number and renders it as a document number.
    pub async fn allocate_document_number(
        &self,
        key: &PartitionKey,
        cancel: &CancellationToken,
    ) -> Result<DocumentNumber> {
        let sequence = self.allocate(key, cancel).await?;
        Ok(DocumentNumber::format(key, sequence))
    }

    fn ensure_active(cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(OccError::Cancelled);
        }
        Ok(())
    }

    async fn advance(
        &self,
        key: &PartitionKey,
        current: VersionedRecord<SequenceCounter>,
        cancel: &CancellationToken,
    ) -> Result<i64> {
        let next = current
            .value
            .sequence()
            .checked_add(1)
            .ok_or_else(|| OccError::AllocationFailed {
                key: key.to_string(),
                reason: "sequence overflow".to_string(),
            })?;
        let intended = current.value.with_sequence(next);

        let committed = self
            .controller
            .execute(
                &*self.store,
                key,
                WriteIntent::new(current, intended),
                &AcceptRemoteIncrement,
                cancel,
            )
            .await
            .map_err(|err| match err {
                OccError::RetriesExhausted { attempts, .. } => {
                    warn!("Sequence allocation for '{}' gave up after {} attempts", key, attempts);
                    OccError::AllocationFailed {
                        key: key.to_string(),
                        reason: format!("contention persisted after {attempts} attempts"),
                    }
                }
                OccError::Aborted { reason, .. } => OccError::AllocationFailed {
                    key: key.to_string(),
                    reason,
                },
                other => other,
            })?;

        Ok(committed.value.sequence())
    }
}
