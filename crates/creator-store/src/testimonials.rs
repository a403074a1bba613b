use tokio::sync::watch;

use creator_shared::models::Testimonial;
use creator_shared::ValidationError;

use crate::collection::{Change, Collection};
use crate::error::Result;
use crate::store::CreatorStore;

impl CreatorStore {
    pub async fn testimonials(&self) -> Vec<Testimonial> {
        self.testimonials.get(self.kv()).await
    }

    pub async fn subscribe_testimonials(&self) -> watch::Receiver<Option<Vec<Testimonial>>> {
        self.testimonials().await;
        self.testimonials.subscribe()
    }

    pub async fn set_testimonials(&self, items: Vec<Testimonial>) -> Result<()> {
        items.iter().try_for_each(Testimonial::validate)?;
        self.testimonials.mutate(self.kv(), items).await
    }

    /// Newest first.
    pub async fn add_testimonial(&self, item: Testimonial) -> Result<()> {
        item.validate()?;
        self.testimonials
            .update(self.kv(), |current| {
                if current.iter().any(|t| t.id == item.id) {
                    return Err(ValidationError::DuplicateId {
                        collection: Collection::Testimonials.name(),
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

    pub async fn remove_testimonial(&self, id: &str) -> Result<bool> {
        self.testimonials
            .update(self.kv(), |current| {
                if !current.iter().any(|t| t.id == id) {
                    return Ok(Change::Keep(false));
                }
                let next = current.iter().filter(|t| t.id != id).cloned().collect();
                Ok(Change::Commit(next, true))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use crate::backend::MemoryBackend;
    use crate::error::StoreError;

    use super::*;

    #[tokio::test]
    async fn test_ratings_outside_range_are_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CreatorStore::new(backend.clone());

        for rating in [0, 6] {
            let err = store
                .add_testimonial(Testimonial::new("Brand", "Great", rating, Utc::now()))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                StoreError::Validation(ValidationError::InvalidRating(r)) if r == rating
            ));
        }
        assert_eq!(backend.write_count(), 0);
        assert!(store.testimonials().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_prepends_and_remove_filters() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        let old = Testimonial::new("Oatly", "Fast turnaround", 5, Utc::now());
        let new = Testimonial::new("Away", "Would book again", 4, Utc::now());
        store.add_testimonial(old.clone()).await.unwrap();
        store.add_testimonial(new.clone()).await.unwrap();
        assert_eq!(store.testimonials().await, vec![new.clone(), old]);

        let dup = store.add_testimonial(new.clone()).await.unwrap_err();
        assert!(matches!(
            dup,
            StoreError::Validation(ValidationError::DuplicateId { .. })
        ));

        assert!(store.remove_testimonial(&new.id).await.unwrap());
        assert_eq!(store.testimonials().await.len(), 1);
    }
}
