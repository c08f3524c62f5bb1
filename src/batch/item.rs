use crate::conflict::{
    ConflictContext, ConflictDecision, ConflictPolicy, ConflictResolver, NewerWins,
    RejectOnConflict,
};
use crate::core::Timestamped;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of an item handled by the batch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemStatus {
    Waiting,
    Processing,
    Completed,
    Failed,
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Waiting => "waiting",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Conflict policy used for status transitions of an item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionPolicy {
    RejectOnConflict,
    NewerWins,
}

impl From<TransitionPolicy> for ConflictPolicy {
    fn from(value: TransitionPolicy) -> Self {
        match value {
            TransitionPolicy::RejectOnConflict => Self::RejectOnConflict,
            TransitionPolicy::NewerWins => Self::NewerWins,
        }
    }
}

/// Entity the batch worker can move through [`ItemStatus`].
pub trait PendingItem: Timestamped + Clone + Send + Sync + 'static {
    /// Policy applied when a transition write conflicts.
    const TRANSITION_POLICY: TransitionPolicy;

    fn status(&self) -> ItemStatus;

    fn created_at(&self) -> DateTime<Utc>;

    /// Copy in `status`, stamped as modified at `at`.
    fn with_status(&self, status: ItemStatus, at: DateTime<Utc>) -> Self;
}

/// Resolver for a single `from -> to` transition.
///
/// A remote that has already left `from` was transitioned by someone else;
/// the write is abandoned so side effects never run twice. Otherwise the item
/// type's own policy decides.
#[derive(Debug, Clone, Copy)]
pub struct TransitionGuard {
    from: ItemStatus,
    policy: TransitionPolicy,
}

impl TransitionGuard {
    pub fn new(from: ItemStatus, policy: TransitionPolicy) -> Self {
        Self { from, policy }
    }
}

impl<T: PendingItem> ConflictResolver<T> for TransitionGuard {
    fn name(&self) -> &'static str {
        "transition_guard"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        let remote_status = ctx.remote.value.status();
        if remote_status != self.from {
            return ConflictDecision::Abort(format!(
                "already transitioned to {remote_status} by another process"
            ));
        }
        match self.policy {
            TransitionPolicy::RejectOnConflict => RejectOnConflict.resolve(ctx),
            TransitionPolicy::NewerWins => NewerWins.resolve(ctx),
        }
    }
}
