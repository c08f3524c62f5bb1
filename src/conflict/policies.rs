use super::{ConflictContext, ConflictDecision, ConflictResolver};
use crate::core::{Sequenced, Timestamped};

/// Any concurrent change is unacceptable.
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectOnConflict;

impl<T> ConflictResolver<T> for RejectOnConflict {
    fn name(&self) -> &'static str {
        "reject_on_conflict"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        ConflictDecision::Abort(format!(
            "record was modified concurrently (now at version {})",
            ctx.remote.token
        ))
    }
}

/// The write with the later `updated_at` wins.
///
/// A strictly newer remote aborts the caller; otherwise the caller's values
/// are written again on top of the remote token.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewerWins;

impl<T> ConflictResolver<T> for NewerWins
where
    T: Timestamped + Clone,
{
    fn name(&self) -> &'static str {
        "newer_wins"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        let ours = ctx.intended.updated_at();
        let theirs = ctx.remote.value.updated_at();
        if theirs > ours {
            ConflictDecision::Abort(format!(
                "remote change at {} is newer than {}",
                theirs.to_rfc3339(),
                ours.to_rfc3339()
            ))
        } else {
            ConflictDecision::RetryWithFreshBaseline(ctx.intended.clone())
        }
    }
}

/// Counter policy: the caller's delta is recomputed from the remote value.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptRemoteIncrement;

impl<T> ConflictResolver<T> for AcceptRemoteIncrement
where
    T: Sequenced,
{
    fn name(&self) -> &'static str {
        "accept_remote_increment"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        let remote = &ctx.remote.value;
        match remote.sequence().checked_add(1) {
            Some(next) => ConflictDecision::RetryWithFreshBaseline(remote.with_sequence(next)),
            None => ConflictDecision::Abort("sequence overflow".to_string()),
        }
    }
}

/// The caller's values overwrite whatever the remote holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientWins;

impl<T: Clone> ConflictResolver<T> for ClientWins {
    fn name(&self) -> &'static str {
        "client_wins"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        ConflictDecision::RetryWithFreshBaseline(ctx.intended.clone())
    }
}

/// The store's values replace the caller's.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreWins;

impl<T: Clone> ConflictResolver<T> for StoreWins {
    fn name(&self) -> &'static str {
        "store_wins"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, T>) -> ConflictDecision<T> {
        ConflictDecision::AcceptRemote(ctx.remote.value.clone())
    }
}
