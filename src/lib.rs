// ============================================================================
// RustOCC Library
// ============================================================================

pub mod batch;
pub mod config;
pub mod conflict;
pub mod core;
pub mod domain;
pub mod retry;
pub mod sequence;
pub mod storage;

// Re-export main types for convenience
pub use crate::core::{
    OccError, RecordKey, Result, Sequenced, Timestamped, VersionToken, VersionedRecord,
};
pub use config::{BatchWorkerConfig, OccConfig, RetryPolicy};

// Re-export the optimistic write pipeline
pub use conflict::{
    AcceptRemoteIncrement, ClientWins, ConflictContext, ConflictDecision, ConflictPolicy,
    ConflictResolver, FieldLevelMerge, NewerWins, RejectOnConflict, StoreWins,
};
pub use retry::{Committed, RetryController, WriteIntent};
pub use storage::{
    CreateOutcome, InMemoryVersionedStore, Predicate, QueryableStore, VersionedStore,
    WriteOutcome,
};

// Re-export sequence allocation and batch processing
pub use batch::{
    BatchReport, BatchWorker, BatchWorkerHandle, ItemProcessor, ItemStatus, PendingItem,
    TransitionGuard, TransitionPolicy, spawn_batch_worker,
};
pub use sequence::{DocumentNumber, DocumentType, PartitionKey, SequenceAllocator, SequenceCounter};

pub use tokio_util::sync::CancellationToken;
