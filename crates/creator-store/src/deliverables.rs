//! Rate-card operations. Every write path validates prices first.

use tokio::sync::watch;

use creator_shared::models::{Deliverable, DeliverablePatch};
use creator_shared::ValidationError;

use crate::collection::{Change, Collection};
use crate::error::{Result, StoreError};
use crate::store::CreatorStore;

impl CreatorStore {
    pub async fn deliverables(&self) -> Vec<Deliverable> {
        self.deliverables.get(self.kv()).await
    }

    pub async fn active_deliverables(&self) -> Vec<Deliverable> {
        self.deliverables()
            .await
            .into_iter()
            .filter(|d| d.is_active)
            .collect()
    }

    pub async fn subscribe_deliverables(&self) -> watch::Receiver<Option<Vec<Deliverable>>> {
        self.deliverables().await;
        self.deliverables.subscribe()
    }

    pub async fn set_deliverables(&self, items: Vec<Deliverable>) -> Result<()> {
        items.iter().try_for_each(Deliverable::validate)?;
        self.deliverables.mutate(self.kv(), items).await
    }

    /// Appended at the end of the rate card.
    pub async fn add_deliverable(&self, item: Deliverable) -> Result<()> {
        item.validate()?;
        self.deliverables
            .update(self.kv(), |current| {
                if current.iter().any(|d| d.id == item.id) {
                    return Err(ValidationError::DuplicateId {
                        collection: Collection::Deliverables.name(),
                        id: item.id.clone(),
                    }
                    .into());
                }
                let mut next = current.clone();
                next.push(item);
                Ok(Change::Commit(next, ()))
            })
            .await
    }

    pub async fn update_deliverable(&self, id: &str, patch: DeliverablePatch) -> Result<Deliverable> {
        self.deliverables
            .update(self.kv(), |current| {
                let pos = current
                    .iter()
                    .position(|d| d.id == id)
                    .ok_or_else(|| StoreError::NotFound {
                        collection: Collection::Deliverables,
                        id: id.to_string(),
                    })?;
                let updated = current[pos].merged(patch);
                updated.validate()?;

                let mut next = current.clone();
                next[pos] = updated.clone();
                Ok(Change::Commit(next, updated))
            })
            .await
    }

    pub async fn remove_deliverable(&self, id: &str) -> Result<bool> {
        self.deliverables
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use creator_shared::models::default_deliverables;

    use crate::backend::MemoryBackend;
    use crate::store::CreatorStore;

    use super::*;

    fn store() -> (Arc<MemoryBackend>, CreatorStore) {
        let backend = Arc::new(MemoryBackend::new());
        (backend.clone(), CreatorStore::new(backend))
    }

    #[tokio::test]
    async fn test_toggle_one_item_leaves_others() {
        let (_, store) = store();
        let updated = store
            .update_deliverable(
                "1",
                DeliverablePatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.is_active);

        let seed = default_deliverables();
        let current = store.deliverables().await;
        assert_eq!(current[0], Deliverable { is_active: false, ..seed[0].clone() });
        assert_eq!(current[1..], seed[1..]);
        assert_eq!(store.active_deliverables().await.len(), 2);
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected_before_write() {
        let (backend, store) = store();
        let err = store
            .update_deliverable(
                "2",
                DeliverablePatch {
                    price: Some(-10.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(ValidationError::InvalidPrice(_))));
        assert_eq!(backend.write_count(), 0);

        let err = store
            .add_deliverable(Deliverable::new("Bad", "", f64::INFINITY))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let mut list = default_deliverables();
        list[4].price = -1.0;
        assert!(store.set_deliverables(list).await.is_err());
        assert_eq!(store.deliverables().await, default_deliverables());
    }

    #[tokio::test]
    async fn test_add_remove_and_missing_ids() {
        let (_, store) = store();
        let extra = Deliverable::new("Whitelisting", "Ads from creator handle", 400.0);
        store.add_deliverable(extra.clone()).await.unwrap();
        assert_eq!(store.deliverables().await.last(), Some(&extra));

        assert!(store.remove_deliverable("3").await.unwrap());
        assert!(!store.remove_deliverable("3").await.unwrap());
        assert_eq!(store.deliverables().await.len(), 5);

        let err = store
            .update_deliverable("nope", DeliverablePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
