use tokio::sync::watch;

use creator_shared::models::PortfolioItem;
use creator_shared::ValidationError;

use crate::collection::{Change, Collection};
use crate::error::Result;
use crate::store::CreatorStore;

impl CreatorStore {
    /// Newest first.
    pub async fn portfolio(&self) -> Vec<PortfolioItem> {
        self.portfolio.get(self.kv()).await
    }

    pub async fn subscribe_portfolio(&self) -> watch::Receiver<Option<Vec<PortfolioItem>>> {
        self.portfolio().await;
        self.portfolio.subscribe()
    }

    pub async fn set_portfolio(&self, items: Vec<PortfolioItem>) -> Result<()> {
        items.iter().try_for_each(PortfolioItem::validate)?;
        self.portfolio.mutate(self.kv(), items).await
    }

    pub async fn add_portfolio_item(&self, item: PortfolioItem) -> Result<()> {
        item.validate()?;
        self.portfolio
            .update(self.kv(), |current| {
                if current.iter().any(|p| p.id == item.id) {
                    return Err(ValidationError::DuplicateId {
                        collection: Collection::Portfolio.name(),
                        id: item.id.clone(),
                    }
                    .into());
                }
                let mut next = Vec::with_capacity(current.len() + 1);
                next.push(item);
                next.extend_from_slice(current);
                Ok(Change::Commit(next, ()))
            })
            .await
    }

    pub async fn remove_portfolio_item(&self, id: &str) -> Result<bool> {
        self.portfolio
            .update(self.kv(), |current| {
                if !current.iter().any(|p| p.id == id) {
                    return Ok(Change::Keep(false));
                }
                let next = current.iter().filter(|p| p.id != id).cloned().collect();
                Ok(Change::Commit(next, true))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use creator_shared::models::MediaKind;

    use crate::backend::MemoryBackend;
    use crate::store::CreatorStore;

    use super::*;

    #[tokio::test]
    async fn test_newest_first_and_removal() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CreatorStore::new(backend.clone());
        let now = Utc::now();
        let older = PortfolioItem::new(MediaKind::Photo, "a.jpg", "Food", now);
        let newer = PortfolioItem::new(MediaKind::Video, "b.mp4", "Food", now + Duration::minutes(1));

        store.add_portfolio_item(older.clone()).await.unwrap();
        store.add_portfolio_item(newer.clone()).await.unwrap();
        assert_eq!(store.portfolio().await, vec![newer.clone(), older.clone()]);

        let writes = backend.write_count();
        assert!(!store.remove_portfolio_item("missing").await.unwrap());
        assert_eq!(backend.write_count(), writes);

        assert!(store.remove_portfolio_item(&newer.id).await.unwrap());
        assert_eq!(store.portfolio().await, vec![older]);
    }

    #[tokio::test]
    async fn test_rejects_duplicates_and_empty_uri() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        let item = PortfolioItem::new(MediaKind::Photo, "a.jpg", "Food", Utc::now());
        store.add_portfolio_item(item.clone()).await.unwrap();

        let err = store.add_portfolio_item(item).await.unwrap_err();
        assert!(err.is_validation());

        let blank = PortfolioItem::new(MediaKind::Photo, "", "Food", Utc::now());
        assert!(store.add_portfolio_item(blank).await.unwrap_err().is_validation());
        assert_eq!(store.portfolio().await.len(), 1);
    }
}
