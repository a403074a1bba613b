//! Domain records for every persisted creator collection.
//!
//! All structs serialize with camelCase field names, which is the on-disk
//! form of each collection. Structs that may have been written by older app
//! versions use `#[serde(default)]` so missing fields do not turn a whole
//! collection into "malformed".

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{ANALYTICS_WINDOW_DAYS, DEFAULT_CURRENCY};
use crate::error::ValidationError;
use crate::types::{new_id, normalize_username};

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn check_amount(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Booking availability shown on the public page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    #[default]
    Available,
    Limited,
    Booked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialLink {
    pub id: String,
    pub platform: String,
    pub url: String,
}

/// The creator's profile. A singleton, created with defaults on first load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatorProfile {
    pub name: String,
    /// URL-safe slug of the public page.
    pub username: String,
    pub bio: String,
    /// Local file path or remote URL of the headshot.
    pub avatar_url: String,
    pub contact_email: String,
    pub niches: Vec<String>,
    pub social_links: Vec<SocialLink>,
    pub availability: Availability,
    /// Free text, only meaningful while `availability` is `Booked`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_until: Option<String>,
}

/// Partial update for [`CreatorProfile`]. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub contact_email: Option<String>,
    pub niches: Option<Vec<String>>,
    pub social_links: Option<Vec<SocialLink>>,
    pub availability: Option<Availability>,
    pub booked_until: Option<Option<String>>,
}

impl CreatorProfile {
    /// A stored username is already in slug form.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if normalize_username(&self.username) != self.username {
            return Err(ValidationError::UnnormalizedUsername(self.username.clone()));
        }
        Ok(())
    }

    pub fn merged(&self, patch: ProfilePatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.name {
            next.name = v;
        }
        if let Some(v) = patch.username {
            next.username = v;
        }
        if let Some(v) = patch.bio {
            next.bio = v;
        }
        if let Some(v) = patch.avatar_url {
            next.avatar_url = v;
        }
        if let Some(v) = patch.contact_email {
            next.contact_email = v;
        }
        if let Some(v) = patch.niches {
            next.niches = v;
        }
        if let Some(v) = patch.social_links {
            next.social_links = v;
        }
        if let Some(v) = patch.availability {
            next.availability = v;
        }
        if let Some(v) = patch.booked_until {
            next.booked_until = v;
        }
        next
    }

    /// Add the niche if absent, remove it if present.
    pub fn with_niche_toggled(&self, niche: &str) -> Self {
        let mut next = self.clone();
        if let Some(pos) = next.niches.iter().position(|n| n == niche) {
            next.niches.remove(pos);
        } else {
            next.niches.push(niche.to_string());
        }
        next
    }
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Photo,
    Video,
}

/// A single piece of work shown in the portfolio grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioItem {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: MediaKind,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_uri: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PortfolioItem {
    pub fn new(kind: MediaKind, uri: impl Into<String>, category: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            kind,
            uri: uri.into(),
            thumbnail_uri: None,
            category: category.into(),
            brand_name: None,
            description: None,
            created_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("id", &self.id)?;
        require("uri", &self.uri)
    }
}

// ---------------------------------------------------------------------------
// Deliverables (rate card)
// ---------------------------------------------------------------------------

/// A rate-card line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deliverable {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub is_active: bool,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct DeliverablePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub is_active: Option<bool>,
}

impl Deliverable {
    pub fn new(title: impl Into<String>, description: impl Into<String>, price: f64) -> Self {
        Self {
            id: new_id(),
            title: title.into(),
            description: description.into(),
            price,
            currency: default_currency(),
            is_active: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("id", &self.id)?;
        require("title", &self.title)?;
        if !check_amount(self.price) {
            return Err(ValidationError::InvalidPrice(self.price));
        }
        Ok(())
    }

    pub fn merged(&self, patch: DeliverablePatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.title {
            next.title = v;
        }
        if let Some(v) = patch.description {
            next.description = v;
        }
        if let Some(v) = patch.price {
            next.price = v;
        }
        if let Some(v) = patch.currency {
            next.currency = v;
        }
        if let Some(v) = patch.is_active {
            next.is_active = v;
        }
        next
    }
}

/// The rate card every new install starts with.
pub fn default_deliverables() -> Vec<Deliverable> {
    let seed = |id: &str, title: &str, description: &str, price: f64, is_active: bool| Deliverable {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        price,
        currency: default_currency(),
        is_active,
    };

    vec![
        seed("1", "Single UGC Video", "One 30-60s video with hook, body, and CTA", 250.0, true),
        seed("2", "3-Video Bundle", "Three videos with different hooks/angles", 650.0, true),
        seed("3", "Photo Bundle (5 Photos)", "Five styled product photos, edited and delivered", 300.0, true),
        seed("4", "Usage Rights (30 days)", "Brand can use content in paid ads for 30 days", 150.0, false),
        seed("5", "Revision", "One round of revisions on any deliverable", 50.0, false),
    ]
}

// ---------------------------------------------------------------------------
// Deals
// ---------------------------------------------------------------------------

/// Pipeline stage of a brand deal, in pipeline order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    #[default]
    New,
    InTalks,
    Contracted,
    Delivered,
    Paid,
}

impl DealStatus {
    pub const ALL: [DealStatus; 5] = [
        DealStatus::New,
        DealStatus::InTalks,
        DealStatus::Contracted,
        DealStatus::Delivered,
        DealStatus::Paid,
    ];

    /// The following stage, or `None` at `Paid`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::InTalks),
            Self::InTalks => Some(Self::Contracted),
            Self::Contracted => Some(Self::Delivered),
            Self::Delivered => Some(Self::Paid),
            Self::Paid => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InTalks => "In Talks",
            Self::Contracted => "Contracted",
            Self::Delivered => "Delivered",
            Self::Paid => "Paid",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandDeal {
    pub id: String,
    pub brand_name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default)]
    pub status: DealStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DealPatch {
    pub brand_name: Option<String>,
    pub contact_email: Option<String>,
    pub description: Option<String>,
    pub budget: Option<Option<f64>>,
    pub status: Option<DealStatus>,
    pub notes: Option<Option<String>>,
}

impl BrandDeal {
    pub fn new(brand_name: impl Into<String>, contact_email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            brand_name: brand_name.into(),
            contact_email: contact_email.into(),
            description: String::new(),
            budget: None,
            status: DealStatus::New,
            created_at: now,
            updated_at: now,
            notes: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("id", &self.id)?;
        require("brandName", &self.brand_name)?;
        if let Some(budget) = self.budget {
            if !check_amount(budget) {
                return Err(ValidationError::InvalidBudget(budget));
            }
        }
        Ok(())
    }

    /// Apply a patch and stamp `updated_at`. Status may jump freely here.
    pub fn merged(&self, patch: DealPatch, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.brand_name {
            next.brand_name = v;
        }
        if let Some(v) = patch.contact_email {
            next.contact_email = v;
        }
        if let Some(v) = patch.description {
            next.description = v;
        }
        if let Some(v) = patch.budget {
            next.budget = v;
        }
        if let Some(v) = patch.status {
            next.status = v;
        }
        if let Some(v) = patch.notes {
            next.notes = v;
        }
        next.updated_at = now;
        next
    }
}

// ---------------------------------------------------------------------------
// Testimonials
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: String,
    pub brand_name: String,
    pub content: String,
    pub rating: u8,
    pub created_at: DateTime<Utc>,
}

impl Testimonial {
    pub fn new(brand_name: impl Into<String>, content: impl Into<String>, rating: u8, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            brand_name: brand_name.into(),
            content: content.into(),
            rating,
            created_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("id", &self.id)?;
        require("brandName", &self.brand_name)?;
        require("content", &self.content)?;
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::InvalidRating(self.rating));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Counter that [`AnalyticsData::record`] can bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    TotalViews,
    PortfolioClicks,
    RateCardViews,
    Inquiries,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayViews {
    pub date: NaiveDate,
    pub views: u64,
}

/// Public-page engagement counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsData {
    pub total_views: u64,
    /// Oldest first, at most [`ANALYTICS_WINDOW_DAYS`] entries.
    pub views_by_day: Vec<DayViews>,
    pub portfolio_clicks: u64,
    pub rate_card_views: u64,
    pub inquiries: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsPatch {
    pub total_views: Option<u64>,
    pub views_by_day: Option<Vec<DayViews>>,
    pub portfolio_clicks: Option<u64>,
    pub rate_card_views: Option<u64>,
    pub inquiries: Option<u64>,
}

impl AnalyticsData {
    pub fn counter(&self, metric: Metric) -> u64 {
        match metric {
            Metric::TotalViews => self.total_views,
            Metric::PortfolioClicks => self.portfolio_clicks,
            Metric::RateCardViews => self.rate_card_views,
            Metric::Inquiries => self.inquiries,
        }
    }

    fn counter_mut(&mut self, metric: Metric) -> &mut u64 {
        match metric {
            Metric::TotalViews => &mut self.total_views,
            Metric::PortfolioClicks => &mut self.portfolio_clicks,
            Metric::RateCardViews => &mut self.rate_card_views,
            Metric::Inquiries => &mut self.inquiries,
        }
    }

    /// Bump `metric` and the bucket for `day`, evicting the oldest buckets
    /// beyond the window.
    pub fn record(&self, metric: Metric, day: NaiveDate) -> Self {
        let mut next = self.clone();
        let counter = next.counter_mut(metric);
        *counter = counter.saturating_add(1);

        match next.views_by_day.iter_mut().find(|d| d.date == day) {
            Some(bucket) => bucket.views = bucket.views.saturating_add(1),
            None => next.views_by_day.push(DayViews { date: day, views: 1 }),
        }
        next.trim_window();
        next
    }

    pub fn merged(&self, patch: AnalyticsPatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.total_views {
            next.total_views = v;
        }
        if let Some(v) = patch.views_by_day {
            next.views_by_day = v;
        }
        if let Some(v) = patch.portfolio_clicks {
            next.portfolio_clicks = v;
        }
        if let Some(v) = patch.rate_card_views {
            next.rate_card_views = v;
        }
        if let Some(v) = patch.inquiries {
            next.inquiries = v;
        }
        next.trim_window();
        next
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.views_by_day.len() > ANALYTICS_WINDOW_DAYS {
            return Err(ValidationError::WindowExceeded {
                days: self.views_by_day.len(),
                max: ANALYTICS_WINDOW_DAYS,
            });
        }
        Ok(())
    }

    fn trim_window(&mut self) {
        let len = self.views_by_day.len();
        if len > ANALYTICS_WINDOW_DAYS {
            self.views_by_day.drain(..len - ANALYTICS_WINDOW_DAYS);
        }
    }
}

// ---------------------------------------------------------------------------
// Invoices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Unit price.
    pub price: f64,
    pub quantity: u32,
}

impl InvoiceItem {
    pub fn from_deliverable(deliverable: &Deliverable) -> Self {
        Self {
            title: deliverable.title.clone(),
            description: Some(deliverable.description.clone()).filter(|d| !d.is_empty()),
            price: deliverable.price,
            quantity: 1,
        }
    }

    pub fn amount(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require("title", &self.title)?;
        if !check_amount(self.price) {
            return Err(ValidationError::InvalidPrice(self.price));
        }
        if self.quantity == 0 {
            return Err(ValidationError::InvalidQuantity(self.quantity));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_id: Option<String>,
    pub brand_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_email: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub total: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    pub brand_name: Option<String>,
    pub brand_email: Option<Option<String>>,
    pub items: Option<Vec<InvoiceItem>>,
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl Invoice {
    pub fn new(brand_name: impl Into<String>, items: Vec<InvoiceItem>, now: DateTime<Utc>) -> Self {
        let total = Self::compute_total(&items);
        Self {
            id: new_id(),
            deal_id: None,
            brand_name: brand_name.into(),
            brand_email: None,
            items,
            total,
            status: InvoiceStatus::Draft,
            created_at: now,
            due_date: None,
            notes: None,
        }
    }

    pub fn compute_total(items: &[InvoiceItem]) -> f64 {
        items.iter().map(InvoiceItem::amount).sum()
    }

    /// Checks the record as given, including that `total` matches the items.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("id", &self.id)?;
        require("brandName", &self.brand_name)?;
        self.items.iter().try_for_each(InvoiceItem::validate)?;

        let expected = Self::compute_total(&self.items);
        if (self.total - expected).abs() > 1e-9 * expected.abs().max(1.0) {
            return Err(ValidationError::TotalMismatch {
                expected,
                got: self.total,
            });
        }
        Ok(())
    }

    /// Apply a patch; the total always follows the line items.
    pub fn merged(&self, patch: InvoicePatch) -> Self {
        let mut next = self.clone();
        if let Some(v) = patch.brand_name {
            next.brand_name = v;
        }
        if let Some(v) = patch.brand_email {
            next.brand_email = v;
        }
        if let Some(v) = patch.items {
            next.items = v;
        }
        if let Some(v) = patch.status {
            next.status = v;
        }
        if let Some(v) = patch.due_date {
            next.due_date = v;
        }
        if let Some(v) = patch.notes {
            next.notes = v;
        }
        next.total = Self::compute_total(&next.items);
        next
    }
}
