use crate::config::RetryPolicy;
use crate::conflict::{ConflictContext, ConflictDecision, ConflictResolver};
use crate::core::{OccError, RecordKey, Result, VersionToken, VersionedRecord};
use crate::storage::{VersionedStore, WriteOutcome};
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// A write the caller wants to commit on top of a record it read.
#[derive(Debug, Clone)]
pub struct WriteIntent<T> {
    /// Record as read, including the token the write is conditional on.
    pub baseline: VersionedRecord<T>,
    /// Value to write.
    pub intended: T,
}

impl<T> WriteIntent<T> {
    pub fn new(baseline: VersionedRecord<T>, intended: T) -> Self {
        Self { baseline, intended }
    }
}

/// Successful outcome of [`RetryController::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed<T> {
    /// The value that was actually stored; may differ from the intent after
    /// conflict resolution.
    pub value: T,
    pub token: VersionToken,
    /// Number of conditional writes issued, including the successful one.
    pub attempts: u32,
}

impl<T> Committed<T> {
    pub fn into_record(self) -> VersionedRecord<T> {
        VersionedRecord::new(self.value, self.token)
    }
}

/// Sole retry authority for conditional writes.
///
/// Each invocation runs attempt, resolve, wait, attempt... sequentially and
/// ends in exactly one of: committed, aborted, retries exhausted, not found
/// or cancelled. Neither the store nor the resolver retry on their own.
#[derive(Debug, Clone, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Commits `intent`, consulting `resolver` on every conflict.
    ///
    /// # Examples
    ///
    /// ```
    /// use rustocc::{
    ///     CancellationToken, ClientWins, CreateOutcome, InMemoryVersionedStore, RetryController,
    ///     VersionedRecord, VersionedStore, WriteIntent,
    /// };
    ///
    /// # tokio_test::block_on(async {
    /// let store = InMemoryVersionedStore::<u64, i64>::new();
    /// let CreateOutcome::Created(token) = store.create(&1, 10).await.unwrap() else {
    ///     panic!("record already exists");
    /// };
    ///
    /// let committed = RetryController::default()
    ///     .execute(
    ///         &store,
    ///         &1,
    ///         WriteIntent::new(VersionedRecord::new(10, token), 11),
    ///         &ClientWins,
    ///         &CancellationToken::new(),
    ///     )
    ///     .await
    ///     .unwrap();
    /// assert_eq!(committed.value, 11);
    /// # });
    /// ```
    pub async fn execute<K, T, S, R>(
        &self,
        store: &S,
        key: &K,
        intent: WriteIntent<T>,
        resolver: &R,
        cancel: &CancellationToken,
    ) -> Result<Committed<T>>
    where
        K: RecordKey,
        T: Clone + Send + Sync + 'static,
        S: VersionedStore<K, T> + ?Sized,
        R: ConflictResolver<T> + ?Sized,
    {
        let WriteIntent { baseline, intended } = intent;
        let mut original = baseline.value;
        let mut expected = baseline.token;
        let mut value = intended;
        let mut retries = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(OccError::Cancelled);
            }

            let remote = match store.conditional_write(key, value.clone(), expected).await? {
                WriteOutcome::Committed(token) => {
                    return Ok(Committed {
                        value,
                        token,
                        attempts: retries + 1,
                    });
                }
                WriteOutcome::NotFound => return Err(OccError::NotFound(key.to_string())),
                WriteOutcome::Conflict(remote) => remote,
            };

            debug!(
                "Conflict on '{}' (attempt {}): expected {}, found {}; resolving with {}",
                key,
                retries + 1,
                expected,
                remote.token,
                resolver.name()
            );

            let decision = resolver.resolve(&ConflictContext {
                original: &original,
                intended: &value,
                remote: &remote,
            });
            let next = match decision {
                ConflictDecision::Abort(reason) => {
                    return Err(OccError::Aborted {
                        key: key.to_string(),
                        reason,
                    });
                }
                ConflictDecision::RetryWithFreshBaseline(next)
                | ConflictDecision::AcceptRemote(next) => next,
            };

            if retries >= self.policy.max_retries {
                return Err(OccError::RetriesExhausted {
                    key: key.to_string(),
                    attempts: retries + 1,
                });
            }

            expected = remote.token;
            original = remote.value;
            value = next;

            if cancel.is_cancelled() {
                return Err(OccError::Cancelled);
            }

            let backoff = self.policy.delay_for_retry(retries);
            warn!(
                "RetryController retry on conflict for '{}' (retry {} of {}, backoff={}ms)",
                key,
                retries + 1,
                self.policy.max_retries,
                backoff.as_millis()
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(OccError::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
            retries += 1;
        }
    }
}
