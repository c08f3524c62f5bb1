use thiserror::Error;

/// Error taxonomy for optimistic concurrency operations.
///
/// A version conflict is deliberately absent: it travels as
/// [`WriteOutcome::Conflict`](crate::storage::WriteOutcome::Conflict) and is
/// always handed to a conflict resolver, never surfaced raw.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OccError {
    #[error("Record '{0}' not found")]
    NotFound(String),

    #[error("Record '{0}' already exists")]
    AlreadyExists(String),

    #[error("Write to '{key}' aborted: {reason}")]
    Aborted { key: String, reason: String },

    #[error("Retries exhausted for '{key}' after {attempts} attempts")]
    RetriesExhausted { key: String, attempts: u32 },

    #[error("Sequence allocation failed for '{key}': {reason}")]
    AllocationFailed { key: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl OccError {
    /// HTTP-equivalent status for callers that surface these outcomes over a
    /// request/response boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::AlreadyExists(_) | Self::Aborted { .. } => 409,
            Self::RetriesExhausted { .. } | Self::AllocationFailed { .. } => 503,
            Self::Cancelled => 499,
            Self::InvalidConfig(_) => 400,
            Self::Processing(_) | Self::Storage(_) => 500,
        }
    }

    /// Transient contention: the caller may try the whole operation again.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::RetriesExhausted { .. } | Self::AllocationFailed { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, OccError>;
