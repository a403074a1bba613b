//! The creator data repository.
//!
//! [`CreatorStore`] holds one [`CachedCollection`] per collection over an
//! injected [`KvBackend`]. Domain convenience operations live next to their
//! collection in the sibling modules (`deals.rs`, `analytics.rs`, ...), each
//! adding an `impl CreatorStore` block.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use creator_shared::clock::{Clock, SystemClock};
use creator_shared::constants::COLLECTION_KEY_PREFIX;
use creator_shared::models::{
    default_deliverables, AnalyticsData, BrandDeal, CreatorProfile, Deliverable, Invoice,
    PortfolioItem, Testimonial,
};

use crate::backend::KvBackend;
use crate::collection::{CachedCollection, Collection};
use crate::error::{Result, StoreError};

/// The snapshots a public-page publish needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishSnapshot {
    pub profile: CreatorProfile,
    pub portfolio: Vec<PortfolioItem>,
    pub deliverables: Vec<Deliverable>,
    pub testimonials: Vec<Testimonial>,
}

pub struct CreatorStore {
    backend: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    pub(crate) profile: CachedCollection<CreatorProfile>,
    pub(crate) portfolio: CachedCollection<Vec<PortfolioItem>>,
    pub(crate) deliverables: CachedCollection<Vec<Deliverable>>,
    pub(crate) deals: CachedCollection<Vec<BrandDeal>>,
    pub(crate) testimonials: CachedCollection<Vec<Testimonial>>,
    pub(crate) analytics: CachedCollection<AnalyticsData>,
    pub(crate) invoices: CachedCollection<Vec<Invoice>>,
    pub(crate) onboarded: CachedCollection<bool>,
}

impl CreatorStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_clock(backend, Arc::new(SystemClock))
    }

    pub fn with_clock(backend: Arc<dyn KvBackend>, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            profile: CachedCollection::new(Collection::Profile, CreatorProfile::default),
            portfolio: CachedCollection::new(Collection::Portfolio, Vec::new),
            deliverables: CachedCollection::new(Collection::Deliverables, default_deliverables),
            deals: CachedCollection::new(Collection::Deals, Vec::new),
            testimonials: CachedCollection::new(Collection::Testimonials, Vec::new),
            analytics: CachedCollection::new(Collection::Analytics, AnalyticsData::default),
            invoices: CachedCollection::new(Collection::Invoices, Vec::new),
            onboarded: CachedCollection::new(Collection::Onboarded, || false),
        }
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    pub(crate) fn kv(&self) -> &dyn KvBackend {
        self.backend.as_ref()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Snapshot of any collection in its persisted JSON shape, for UI bridges
    /// that address collections by name.
    pub async fn get_json(&self, collection: Collection) -> Result<Value> {
        let value = match collection {
            Collection::Profile => serde_json::to_value(self.profile().await)?,
            Collection::Portfolio => serde_json::to_value(self.portfolio().await)?,
            Collection::Deliverables => serde_json::to_value(self.deliverables().await)?,
            Collection::Deals => serde_json::to_value(self.deals().await)?,
            Collection::Testimonials => serde_json::to_value(self.testimonials().await)?,
            Collection::Analytics => serde_json::to_value(self.analytics().await)?,
            Collection::Invoices => serde_json::to_value(self.invoices().await)?,
            Collection::Onboarded => Value::Bool(self.has_onboarded().await),
        };
        Ok(value)
    }

    /// Replace any collection from its JSON shape. The value is decoded and
    /// validated before anything is written.
    pub async fn mutate_json(&self, collection: Collection, value: Value) -> Result<()> {
        fn decode<T: DeserializeOwned>(collection: Collection, value: Value) -> Result<T> {
            serde_json::from_value(value).map_err(|source| StoreError::Shape { collection, source })
        }

        match collection {
            Collection::Profile => self.set_profile(decode(collection, value)?).await,
            Collection::Portfolio => self.set_portfolio(decode(collection, value)?).await,
            Collection::Deliverables => self.set_deliverables(decode(collection, value)?).await,
            Collection::Deals => self.set_deals(decode(collection, value)?).await,
            Collection::Testimonials => self.set_testimonials(decode(collection, value)?).await,
            Collection::Analytics => self.set_analytics(decode(collection, value)?).await,
            Collection::Invoices => self.set_invoices(decode(collection, value)?).await,
            Collection::Onboarded => self.set_onboarded(decode(collection, value)?).await,
        }
    }

    pub async fn publish_snapshot(&self) -> PublishSnapshot {
        PublishSnapshot {
            profile: self.profile().await,
            portfolio: self.portfolio().await,
            deliverables: self.deliverables().await,
            testimonials: self.testimonials().await,
        }
    }

    /// Erase every collection.
    ///
    /// All collection locks are held for the duration, so no mutation can
    /// land between the clear and the invalidation. Snapshots are dropped
    /// even when the clear fails, so the next read reflects whatever storage
    /// actually holds.
    pub async fn wipe(&self) -> Result<()> {
        let mut profile = self.profile.lock().await;
        let mut portfolio = self.portfolio.lock().await;
        let mut deliverables = self.deliverables.lock().await;
        let mut deals = self.deals.lock().await;
        let mut testimonials = self.testimonials.lock().await;
        let mut analytics = self.analytics.lock().await;
        let mut invoices = self.invoices.lock().await;
        let mut onboarded = self.onboarded.lock().await;

        let result = self.backend.clear(COLLECTION_KEY_PREFIX).await;

        self.profile.invalidate(&mut profile);
        self.portfolio.invalidate(&mut portfolio);
        self.deliverables.invalidate(&mut deliverables);
        self.deals.invalidate(&mut deals);
        self.testimonials.invalidate(&mut testimonials);
        self.analytics.invalidate(&mut analytics);
        self.invoices.invalidate(&mut invoices);
        self.onboarded.invalidate(&mut onboarded);

        result?;
        info!("all creator data wiped");
        Ok(())
    }
}
