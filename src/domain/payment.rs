use crate::batch::{ItemProcessor, ItemStatus, PendingItem, TransitionPolicy};
use crate::core::{OccError, Result, Timestamped};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type PaymentId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub amount_cents: i64,
    pub status: ItemStatus,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn waiting(id: PaymentId, amount_cents: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            amount_cents,
            status: ItemStatus::Waiting,
            is_processed: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Timestamped for Payment {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// A payment claimed by another process must never be processed twice.
impl PendingItem for Payment {
    const TRANSITION_POLICY: TransitionPolicy = TransitionPolicy::RejectOnConflict;

    fn status(&self) -> ItemStatus {
        self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn with_status(&self, status: ItemStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            is_processed: self.is_processed || status == ItemStatus::Completed,
            updated_at: at,
            ..self.clone()
        }
    }
}

/// Processor that only validates the amount; settlement happens elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentValidator;

#[async_trait]
impl ItemProcessor<Payment> for PaymentValidator {
    async fn process(&self, item: &Payment) -> Result<()> {
        if item.amount_cents <= 0 {
            return Err(OccError::Processing(format!(
                "payment {} has non-positive amount {}",
                item.id, item.amount_cents
            )));
        }
        Ok(())
    }
}
