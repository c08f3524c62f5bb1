use super::VersionToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// Key usable for conditional access to a record.
pub trait RecordKey: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static {}

impl<K> RecordKey for K where K: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static {}

/// Immutable snapshot of a payload together with the token it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedRecord<T> {
    pub value: T,
    pub token: VersionToken,
}

impl<T> VersionedRecord<T> {
    pub fn new(value: T, token: VersionToken) -> Self {
        Self { value, token }
    }
}

/// Payloads carrying a caller-visible modification timestamp.
pub trait Timestamped {
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Payloads carrying a monotonically increasing counter.
pub trait Sequenced: Sized {
    fn sequence(&self) -> i64;

    /// Returns a copy holding `sequence`, with any modification stamp refreshed.
    fn with_sequence(&self, sequence: i64) -> Self;
}
