pub mod engine;
pub mod memory;
pub mod predicate;

pub use engine::{CreateOutcome, QueryableStore, VersionedStore, WriteOutcome};
pub use memory::InMemoryVersionedStore;
pub use predicate::Predicate;
