use crate::batch::{ItemStatus, PendingItem, TransitionPolicy};
use crate::core::{OccError, Result, Timestamped, VersionedRecord};
use crate::sequence::{
    DocumentNumber, DocumentType, PartitionKey, SequenceAllocator, SequenceCounter,
};
use crate::storage::{CreateOutcome, VersionedStore};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub number: DocumentNumber,
    pub document_type: DocumentType,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn waiting(number: DocumentNumber, document_type: DocumentType) -> Self {
        let now = Utc::now();
        Self {
            number,
            document_type,
            status: ItemStatus::Waiting,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Timestamped for Document {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl PendingItem for Document {
    const TRANSITION_POLICY: TransitionPolicy = TransitionPolicy::NewerWins;

    fn status(&self) -> ItemStatus {
        self.status
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn with_status(&self, status: ItemStatus, at: DateTime<Utc>) -> Self {
        Self {
            status,
            updated_at: at,
            ..self.clone()
        }
    }
}

/// Creates documents under freshly allocated numbers.
pub struct DocumentService<A: ?Sized, D: ?Sized> {
    allocator: SequenceAllocator<A>,
    documents: Arc<D>,
}

impl<A, D> DocumentService<A, D>
where
    A: VersionedStore<PartitionKey, SequenceCounter> + ?Sized,
    D: VersionedStore<DocumentNumber, Document> + ?Sized,
{
    pub fn new(allocator: SequenceAllocator<A>, documents: Arc<D>) -> Self {
        Self {
            allocator,
            documents,
        }
    }

    /// Allocates a number for `(document_type, current year, code)` and stores
    /// a `Waiting` document under it.
    pub async fn create_document(
        &self,
        document_type: DocumentType,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<VersionedRecord<Document>> {
        let key = PartitionKey::for_current_year(document_type, code);
        self.create_document_in(&key, cancel).await
    }

    pub async fn create_document_in(
        &self,
        key: &PartitionKey,
        cancel: &CancellationToken,
    ) -> Result<VersionedRecord<Document>> {
        let number = self.allocator.allocate_document_number(key, cancel).await?;
        let document = Document::waiting(number.clone(), key.document_type);

        match self.documents.create(&number, document.clone()).await? {
            CreateOutcome::Created(token) => {
                info!("Created document {}", number);
                Ok(VersionedRecord::new(document, token))
            }
            CreateOutcome::AlreadyExists => Err(OccError::AlreadyExists(number.to_string())),
        }
    }
}
