#![allow(dead_code)]

use async_trait::async_trait;
use rustocc::{
    CreateOutcome, InMemoryVersionedStore, Predicate, QueryableStore, RecordKey, Result,
    VersionToken, VersionedRecord, VersionedStore, WriteOutcome,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

type Mutation<T> = Box<dyn Fn(&T) -> T + Send + Sync>;

/// Store wrapper simulating a concurrent writer: before selected conditional
/// writes it commits `mutate(current)` on the same key, so the caller's write
/// observes a conflict.
pub struct InterferingStore<K, T> {
    pub inner: InMemoryVersionedStore<K, T>,
    remaining: Mutex<HashMap<K, usize>>,
    mutate: Mutation<T>,
    caller_writes: AtomicUsize,
}

impl<K, T> InterferingStore<K, T>
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
{
    pub fn new(mutate: impl Fn(&T) -> T + Send + Sync + 'static) -> Self {
        Self {
            inner: InMemoryVersionedStore::new(),
            remaining: Mutex::new(HashMap::new()),
            mutate: Box::new(mutate),
            caller_writes: AtomicUsize::new(0),
        }
    }

    /// Interfere with the next `times` conditional writes on `key`.
    pub fn interfere(&self, key: K, times: usize) {
        self.remaining.lock().unwrap().insert(key, times);
    }

    /// Conditional writes issued by code under test.
    pub fn caller_writes(&self) -> usize {
        self.caller_writes.load(Ordering::SeqCst)
    }

    fn take_interference(&self, key: &K) -> bool {
        let mut remaining = self.remaining.lock().unwrap();
        match remaining.get_mut(key) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        }
    }
}

#[async_trait]
impl<K, T> VersionedStore<K, T> for InterferingStore<K, T>
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
{
    async fn read(&self, key: &K) -> Result<Option<VersionedRecord<T>>> {
        self.inner.read(key).await
    }

    async fn conditional_write(
        &self,
        key: &K,
        value: T,
        expected: VersionToken,
    ) -> Result<WriteOutcome<T>> {
        self.caller_writes.fetch_add(1, Ordering::SeqCst);
        if self.take_interference(key) {
            if let Some(current) = self.inner.read(key).await? {
                let concurrent = (self.mutate)(&current.value);
                self.inner
                    .conditional_write(key, concurrent, current.token)
                    .await?;
            }
        }
        self.inner.conditional_write(key, value, expected).await
    }

    async fn create(&self, key: &K, value: T) -> Result<CreateOutcome> {
        self.inner.create(key, value).await
    }
}

#[async_trait]
impl<K, T> QueryableStore<K, T> for InterferingStore<K, T>
where
    K: RecordKey + Ord,
    T: Clone + Send + Sync + 'static,
{
    async fn select(
        &self,
        predicate: &Predicate<T>,
        limit: usize,
    ) -> Result<Vec<(K, VersionedRecord<T>)>> {
        self.inner.select(predicate, limit).await
    }
}

/// Seeds `value` under `key` and returns the stored record.
pub async fn seed<K, T, S>(store: &S, key: K, value: T) -> VersionedRecord<T>
where
    K: RecordKey,
    T: Clone + Send + Sync + 'static,
    S: VersionedStore<K, T> + ?Sized,
{
    match store.create(&key, value.clone()).await.unwrap() {
        CreateOutcome::Created(token) => VersionedRecord::new(value, token),
        CreateOutcome::AlreadyExists => panic!("key {key} already seeded"),
    }
}
