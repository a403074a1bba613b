use tokio::sync::watch;
use tracing::info;

use crate::error::Result;
use crate::store::CreatorStore;

impl CreatorStore {
    pub async fn has_onboarded(&self) -> bool {
        self.onboarded.get(self.kv()).await
    }

    pub async fn subscribe_onboarded(&self) -> watch::Receiver<Option<bool>> {
        self.has_onboarded().await;
        self.onboarded.subscribe()
    }

    pub async fn set_onboarded(&self, done: bool) -> Result<()> {
        self.onboarded.mutate(self.kv(), done).await
    }

    pub async fn complete_onboarding(&self) -> Result<()> {
        self.set_onboarded(true).await?;
        info!("onboarding completed");
        Ok(())
    }

    pub async fn reset_onboarding(&self) -> Result<()> {
        self.set_onboarded(false).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::backend::MemoryBackend;

    use super::*;

    #[tokio::test]
    async fn test_flag_round_trips_as_json_bool() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CreatorStore::new(backend.clone());
        assert!(!store.has_onboarded().await);

        store.complete_onboarding().await.unwrap();
        assert!(store.has_onboarded().await);
        assert_eq!(backend.raw("creator_onboarded").as_deref(), Some("true"));

        store.reset_onboarding().await.unwrap();
        assert_eq!(backend.raw("creator_onboarded").as_deref(), Some("false"));
        assert!(!store.has_onboarded().await);
    }

    #[tokio::test]
    async fn test_subscriber_sees_completion() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        let mut rx = store.subscribe_onboarded().await;
        assert_eq!(*rx.borrow_and_update(), Some(false));

        store.complete_onboarding().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Some(true));
    }
}
