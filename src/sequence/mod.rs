pub mod allocator;
pub mod counter;

pub use allocator::SequenceAllocator;
pub use counter::{DocumentNumber, DocumentType, PartitionKey, SequenceCounter};
