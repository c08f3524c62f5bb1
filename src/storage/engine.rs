use super::predicate::Predicate;
use crate::core::{RecordKey, Result, VersionToken, VersionedRecord};
use async_trait::async_trait;

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome<T> {
    /// The expected token matched; value and token were replaced.
    Committed(VersionToken),
    /// The stored token differs; carries the current record so the caller
    /// can reconcile without another read.
    Conflict(VersionedRecord<T>),
    NotFound,
}

/// Result of a create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(VersionToken),
    AlreadyExists,
}

/// Versioned persistence facade - allows pluggable storage backends.
///
/// Implementations must make `conditional_write` atomic per key: two writes
/// against the same expected token never both commit. The outer `Result`
/// only carries infrastructure failures.
#[async_trait]
pub trait VersionedStore<K, T>: Send + Sync
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
{
    /// Read the current record, `None` when the key is absent
    async fn read(&self, key: &K) -> Result<Option<VersionedRecord<T>>>;

    /// Replace the value iff the stored token equals `expected`
    async fn conditional_write(
        &self,
        key: &K,
        value: T,
        expected: VersionToken,
    ) -> Result<WriteOutcome<T>>;

    /// Insert a new record; never overwrites
    async fn create(&self, key: &K, value: T) -> Result<CreateOutcome>;
}

/// Store that can evaluate typed predicates on behalf of callers.
#[async_trait]
pub trait QueryableStore<K, T>: VersionedStore<K, T>
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
{
    /// Matching records ordered by key, at most `limit` of them
    async fn select(
        &self,
        predicate: &Predicate<T>,
        limit: usize,
    ) -> Result<Vec<(K, VersionedRecord<T>)>>;
}
