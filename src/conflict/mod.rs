//! Conflict resolution policies.
//!
//! A resolver looks at what the caller read, what it tried to write and what
//! the store returned with the conflict, and decides how the retry loop
//! proceeds. Resolvers are pure: no I/O, no retries of their own.

pub mod merge;
pub mod policies;

pub use merge::FieldLevelMerge;
pub use policies::{AcceptRemoteIncrement, ClientWins, NewerWins, RejectOnConflict, StoreWins};

use crate::core::VersionedRecord;
use std::fmt;

/// Everything a resolver may inspect for one conflict.
#[derive(Debug)]
pub struct ConflictContext<'a, T> {
    /// Value the caller based its write on.
    pub original: &'a T,
    /// Value the caller attempted to write.
    pub intended: &'a T,
    /// Current record returned with the conflict.
    pub remote: &'a VersionedRecord<T>,
}

/// What the retry loop does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictDecision<T> {
    /// Stop; the reason is surfaced to the caller.
    Abort(String),
    /// Write the merged value on top of the remote token.
    RetryWithFreshBaseline(T),
    /// Adopt the remote value as the value to write.
    AcceptRemote(T),
}

impl<T> ConflictDecision<T> {
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort(_))
    }
}

pub trait ConflictResolver<T>: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T>;
}

impl<T, R> ConflictResolver<T> for Box<R>
where
    R: ConflictResolver<T> + ?Sized,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        (**self).resolve(ctx)
    }
}

/// Named policies, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictPolicy {
    RejectOnConflict,
    NewerWins,
    FieldLevelMerge,
    AcceptRemoteIncrement,
    ClientWins,
    StoreWins,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RejectOnConflict => "reject_on_conflict",
            Self::NewerWins => "newer_wins",
            Self::FieldLevelMerge => "field_level_merge",
            Self::AcceptRemoteIncrement => "accept_remote_increment",
            Self::ClientWins => "client_wins",
            Self::StoreWins => "store_wins",
        };
        write!(f, "{label}")
    }
}
