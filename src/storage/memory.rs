use super::engine::{CreateOutcome, QueryableStore, VersionedStore, WriteOutcome};
use super::predicate::Predicate;
use crate::core::{RecordKey, Result, VersionToken, VersionedRecord};
use async_trait::async_trait;
use log::trace;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tokio::sync::RwLock;

/// In-process reference implementation of [`VersionedStore`].
///
/// Compare-and-swap happens under the write lock, so the check and the
/// replacement are one indivisible step per key.
pub struct InMemoryVersionedStore<K, T> {
    records: RwLock<HashMap<K, VersionedRecord<T>>>,
}

impl<K, T> Default for InMemoryVersionedStore<K, T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, T> InMemoryVersionedStore<K, T>
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All keys currently stored
    pub async fn keys(&self) -> Vec<K> {
        self.records.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl<K, T> VersionedStore<K, T> for InMemoryVersionedStore<K, T>
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
{
    async fn read(&self, key: &K) -> Result<Option<VersionedRecord<T>>> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn conditional_write(
        &self,
        key: &K,
        value: T,
        expected: VersionToken,
    ) -> Result<WriteOutcome<T>> {
        let mut records = self.records.write().await;
        let Some(current) = records.get_mut(key) else {
            return Ok(WriteOutcome::NotFound);
        };

        if current.token != expected {
            trace!(
                "conditional write on '{}' rejected: expected {}, stored {}",
                key, expected, current.token
            );
            return Ok(WriteOutcome::Conflict(current.clone()));
        }

        let token = VersionToken::generate();
        *current = VersionedRecord::new(value, token);
        Ok(WriteOutcome::Committed(token))
    }

    async fn create(&self, key: &K, value: T) -> Result<CreateOutcome> {
        let mut records = self.records.write().await;
        match records.entry(key.clone()) {
            Entry::Occupied(_) => Ok(CreateOutcome::AlreadyExists),
            Entry::Vacant(slot) => {
                let token = VersionToken::generate();
                slot.insert(VersionedRecord::new(value, token));
                Ok(CreateOutcome::Created(token))
            }
        }
    }
}

#[async_trait]
impl<K, T> QueryableStore<K, T> for InMemoryVersionedStore<K, T>
where
    K: RecordKey + Ord,
    T: Clone + Send + Sync + 'static,
{
    async fn select(
        &self,
        predicate: &Predicate<T>,
        limit: usize,
    ) -> Result<Vec<(K, VersionedRecord<T>)>> {
        let records = self.records.read().await;
        let mut matched: Vec<(K, VersionedRecord<T>)> = records
            .iter()
            .filter(|(_, record)| predicate.matches(&record.value))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        matched.sort_by(|left, right| left.0.cmp(&right.0));
        matched.truncate(limit);
        Ok(matched)
    }
}
