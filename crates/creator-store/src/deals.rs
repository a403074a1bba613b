//! Brand-deal pipeline operations.

use tokio::sync::watch;
use tracing::info;

use creator_shared::insights::PipelineSummary;
use creator_shared::models::{BrandDeal, DealPatch};
use creator_shared::ValidationError;

use crate::collection::{Change, Collection};
use crate::error::{Result, StoreError};
use crate::store::CreatorStore;

fn not_found(id: &str) -> StoreError {
    StoreError::NotFound {
        collection: Collection::Deals,
        id: id.to_string(),
    }
}

impl CreatorStore {
    /// Newest first.
    pub async fn deals(&self) -> Vec<BrandDeal> {
        self.deals.get(self.kv()).await
    }

    pub async fn subscribe_deals(&self) -> watch::Receiver<Option<Vec<BrandDeal>>> {
        self.deals().await;
        self.deals.subscribe()
    }

    pub async fn pipeline_summary(&self) -> PipelineSummary {
        PipelineSummary::from_deals(&self.deals().await)
    }

    pub async fn set_deals(&self, deals: Vec<BrandDeal>) -> Result<()> {
        deals.iter().try_for_each(BrandDeal::validate)?;
        self.deals.mutate(self.kv(), deals).await
    }

    pub async fn add_deal(&self, deal: BrandDeal) -> Result<()> {
        deal.validate()?;
        self.deals
            .update(self.kv(), |current| {
                if current.iter().any(|d| d.id == deal.id) {
                    return Err(ValidationError::DuplicateId {
                        collection: Collection::Deals.name(),
                        id: deal.id.clone(),
                    }
                    .into());
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.push(deal);
                next.extend_from_slice(current);
                Ok(Change::Commit(next, ()))
            })
            .await
    }

    /// Full update; the status may jump to any stage.
    pub async fn update_deal(&self, id: &str, patch: DealPatch) -> Result<BrandDeal> {
        let now = self.now();
        self.deals
            .update(self.kv(), |current| {
                let pos = current.iter().position(|d| d.id == id).ok_or_else(|| not_found(id))?;
                let updated = current[pos].merged(patch, now);
                updated.validate()?;

                let mut next = current.clone();
                next[pos] = updated.clone();
                Ok(Change::Commit(next, updated))
            })
            .await
    }

    /// Move a deal one stage forward. A paid deal is returned unchanged and
    /// nothing is written.
    pub async fn advance_deal(&self, id: &str) -> Result<BrandDeal> {
        let now = self.now();
        let deal = self
            .deals
            .update(self.kv(), |current| {
                let pos = current.iter().position(|d| d.id == id).ok_or_else(|| not_found(id))?;
                let deal = &current[pos];
                let Some(status) = deal.status.next() else {
                    return Ok(Change::Keep(deal.clone()));
                };

                let updated = deal.merged(
                    DealPatch {
                        status: Some(status),
                        ..Default::default()
                    },
                    now,
                );
                let mut next = current.clone();
                next[pos] = updated.clone();
                Ok(Change::Commit(next, updated))
            })
            .await?;

        info!(deal = %deal.id, status = deal.status.label(), "deal advanced");
        Ok(deal)
    }

    pub async fn remove_deal(&self, id: &str) -> Result<bool> {
        self.deals
            .update(self.kv(), |current| {
                if !current.iter().any(|d| d.id == id) {
                    return Ok(Change::Keep(false));
                }
                let next = current.iter().filter(|d| d.id != id).cloned().collect();
                Ok(Change::Commit(next, true))
            })
            .await
    }
}
