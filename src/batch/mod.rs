pub mod item;
pub mod scheduler;
pub mod worker;

pub use item::{ItemStatus, PendingItem, TransitionGuard, TransitionPolicy};
pub use scheduler::{BatchWorkerHandle, spawn_batch_worker};
pub use worker::{BatchReport, BatchWorker, ItemProcessor};
