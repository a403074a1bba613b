//! Profile operations. The profile is a singleton merged by partial patches.

use tokio::sync::watch;

use creator_shared::models::{CreatorProfile, ProfilePatch, SocialLink};
use creator_shared::types::{new_id, normalize_username};
use creator_shared::ValidationError;

use crate::collection::Change;
use crate::error::Result;
use crate::store::CreatorStore;

impl CreatorStore {
    pub async fn profile(&self) -> CreatorProfile {
        self.profile.get(self.kv()).await
    }

    pub async fn subscribe_profile(&self) -> watch::Receiver<Option<CreatorProfile>> {
        self.profile().await;
        self.profile.subscribe()
    }

    /// Stored as given; a username that is not already a slug is rejected.
    pub async fn set_profile(&self, profile: CreatorProfile) -> Result<()> {
        profile.validate()?;
        self.profile.mutate(self.kv(), profile).await
    }

    /// Merge `patch` into the current profile. The username is slugged.
    pub async fn update_profile(&self, mut patch: ProfilePatch) -> Result<CreatorProfile> {
        if let Some(username) = patch.username.as_mut() {
            *username = normalize_username(username);
        }
        self.profile
            .update(self.kv(), |current| {
                let next = current.merged(patch);
                Ok(Change::Commit(next.clone(), next))
            })
            .await
    }

    pub async fn toggle_niche(&self, niche: &str) -> Result<CreatorProfile> {
        self.profile
            .update(self.kv(), |current| {
                let next = current.with_niche_toggled(niche);
                Ok(Change::Commit(next.clone(), next))
            })
            .await
    }

    pub async fn add_social_link(&self, platform: &str, url: &str) -> Result<SocialLink> {
        if url.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "url" }.into());
        }
        let link = SocialLink {
            id: new_id(),
            platform: platform.to_string(),
            url: url.trim().to_string(),
        };
        self.profile
            .update(self.kv(), |current| {
                let mut next = current.clone();
                next.social_links.push(link.clone());
                Ok(Change::Commit(next, link))
            })
            .await
    }

    /// Returns `false` when no link had that id.
    pub async fn remove_social_link(&self, id: &str) -> Result<bool> {
        self.profile
            .update(self.kv(), |current| {
                if !current.social_links.iter().any(|l| l.id == id) {
                    return Ok(Change::Keep(false));
                }
                let mut next = current.clone();
                next.social_links.retain(|l| l.id != id);
                Ok(Change::Commit(next, true))
            })
            .await
    }
}
