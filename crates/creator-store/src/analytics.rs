//! Profile-view analytics with a rolling per-day window.

use chrono::NaiveDate;
use tokio::sync::watch;
use tracing::trace;

use creator_shared::models::{AnalyticsData, AnalyticsPatch, Metric};

use crate::collection::Change;
use crate::error::Result;
use crate::store::CreatorStore;

impl CreatorStore {
    pub async fn analytics(&self) -> AnalyticsData {
        self.analytics.get(self.kv()).await
    }

    pub async fn subscribe_analytics(&self) -> watch::Receiver<Option<AnalyticsData>> {
        self.analytics().await;
        self.analytics.subscribe()
    }

    pub async fn set_analytics(&self, data: AnalyticsData) -> Result<()> {
        data.validate()?;
        self.analytics.mutate(self.kv(), data).await
    }

    pub async fn update_analytics(&self, patch: AnalyticsPatch) -> Result<AnalyticsData> {
        self.analytics
            .update(self.kv(), |current| {
                let next = current.merged(patch);
                Ok(Change::Commit(next.clone(), next))
            })
            .await
    }

    /// Count one event against today's bucket.
    pub async fn increment_analytic(&self, metric: Metric) -> Result<AnalyticsData> {
        let today = self.clock().today();
        self.increment_analytic_on(metric, today).await
    }

    pub async fn increment_analytic_on(&self, metric: Metric, day: NaiveDate) -> Result<AnalyticsData> {
        let next = self
            .analytics
            .update(self.kv(), |current| {
                let next = current.record(metric, day);
                Ok(Change::Commit(next.clone(), next))
            })
            .await?;
        trace!(?metric, %day, value = next.counter(metric), "analytic recorded");
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Days;
    use creator_shared::constants::ANALYTICS_WINDOW_DAYS;
    use creator_shared::models::DayViews;

    use crate::backend::MemoryBackend;

    use super::*;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .checked_add_days(Days::new(n))
            .unwrap()
    }

    #[tokio::test]
    async fn test_window_keeps_the_most_recent_days() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        for n in 0..31 {
            store.increment_analytic_on(Metric::TotalViews, day(n)).await.unwrap();
        }

        let data = store.analytics().await;
        assert_eq!(data.total_views, 31);
        assert_eq!(data.views_by_day.len(), ANALYTICS_WINDOW_DAYS);
        assert_eq!(data.views_by_day.first().map(|d| d.date), Some(day(1)));
        assert_eq!(data.views_by_day.last().map(|d| d.date), Some(day(30)));
    }

    #[tokio::test]
    async fn test_same_day_shares_a_bucket() {
        let store = CreatorStore::new(Arc::new(MemoryBackend::new()));
        store.increment_analytic_on(Metric::TotalViews, day(0)).await.unwrap();
        store.increment_analytic_on(Metric::Inquiries, day(0)).await.unwrap();
        let data = store.increment_analytic_on(Metric::RateCardViews, day(0)).await.unwrap();

        assert_eq!(data.views_by_day, vec![DayViews { date: day(0), views: 3 }]);
        assert_eq!(data.total_views, 1);
        assert_eq!(data.inquiries, 1);
        assert_eq!(data.rate_card_views, 1);
        assert_eq!(data.portfolio_clicks, 0);
    }

    #[tokio::test]
    async fn test_patches_are_trimmed_and_oversized_replacements_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let store = CreatorStore::new(backend.clone());
        let days: Vec<DayViews> = (0..40).map(|n| DayViews { date: day(n), views: 1 }).collect();

        let err = store
            .set_analytics(AnalyticsData {
                views_by_day: days.clone(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(backend.write_count(), 0);

        let data = store
            .update_analytics(AnalyticsPatch {
                views_by_day: Some(days.clone()),
                inquiries: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(data.views_by_day.len(), ANALYTICS_WINDOW_DAYS);
        assert_eq!(data.views_by_day.first().map(|d| d.date), Some(day(10)));
        assert_eq!(data.inquiries, 4);

        let exact = AnalyticsData {
            views_by_day: days[..ANALYTICS_WINDOW_DAYS].to_vec(),
            ..Default::default()
        };
        store.set_analytics(exact.clone()).await.unwrap();
        assert_eq!(store.analytics().await, exact);
    }
}
