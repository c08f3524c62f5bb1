use crate::conflict::{ConflictContext, ConflictDecision, ConflictResolver, FieldLevelMerge};
use crate::core::{OccError, Result, Timestamped, VersionedRecord};
use crate::retry::{RetryController, WriteIntent};
use crate::storage::VersionedStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub type ProductId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        description: impl Into<String>,
        price_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            price_cents,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Timestamped for Product {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Partial update; `None` leaves the field as read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none() && self.price_cents.is_none()
    }

    pub fn apply(&self, product: &Product, at: DateTime<Utc>) -> Product {
        Product {
            name: self.name.clone().unwrap_or_else(|| product.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| product.description.clone()),
            price_cents: self.price_cents.unwrap_or(product.price_cents),
            updated_at: at,
            ..product.clone()
        }
    }
}

/// [`FieldLevelMerge`] for products. The merged value is stamped no earlier
/// than now and never behind the remote's `updated_at`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProductMerge;

impl ConflictResolver<Product> for ProductMerge {
    fn name(&self) -> &'static str {
        "product_merge"
    }

    fn resolve(&self, ctx: &ConflictContext<'_, Product>) -> ConflictDecision<Product> {
        match FieldLevelMerge.resolve(ctx) {
            ConflictDecision::RetryWithFreshBaseline(mut merged) => {
                merged.updated_at = Utc::now()
                    .max(ctx.intended.updated_at)
                    .max(ctx.remote.value.updated_at);
                ConflictDecision::RetryWithFreshBaseline(merged)
            }
            other => other,
        }
    }
}

/// Product edits that merge with concurrent edits to other fields.
pub struct ProductService<S: ?Sized> {
    store: Arc<S>,
    controller: RetryController,
}

impl<S> ProductService<S>
where
    S: VersionedStore<ProductId, Product> + ?Sized,
{
    pub fn new(store: Arc<S>, controller: RetryController) -> Self {
        Self { store, controller }
    }

    pub async fn get(&self, id: ProductId) -> Result<VersionedRecord<Product>> {
        self.store
            .read(&id)
            .await?
            .ok_or_else(|| OccError::NotFound(id.to_string()))
    }

    /// Applies `patch` on top of the current record. Fields edited
    /// concurrently by someone else keep the other writer's value.
    pub async fn update(
        &self,
        id: ProductId,
        patch: &ProductPatch,
        cancel: &CancellationToken,
    ) -> Result<VersionedRecord<Product>> {
        let current = self.get(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let intended = patch.apply(&current.value, Utc::now());
        let committed = self
            .controller
            .execute(
                &*self.store,
                &id,
                WriteIntent::new(current, intended),
                &ProductMerge,
                cancel,
            )
            .await?;
        Ok(committed.into_record())
    }
}
