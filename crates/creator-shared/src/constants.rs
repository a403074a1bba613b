/// Application name
pub const APP_NAME: &str = "UGCio";

/// Prefix shared by every collection key in durable storage
pub const COLLECTION_KEY_PREFIX: &str = "creator_";

/// Durable key holding the RFC 3339 trial start timestamp
pub const TRIAL_START_KEY: &str = "ugcio_trial_start";

/// Durable key caching the last known subscription status ("true" / "false")
pub const SUBSCRIPTION_KEY: &str = "ugcio_subscription_active";

/// Length of the free trial in whole days
pub const TRIAL_DURATION_DAYS: i64 = 14;

/// Store product identifier of the monthly subscription
pub const DEFAULT_PRODUCT_ID: &str = "com.ugcio.app.monthly";

/// Price label shown when the store cannot report a localized price
pub const DEFAULT_PRICE_LABEL: &str = "$9.99/month";

/// Number of day-buckets kept in the analytics view histogram
pub const ANALYTICS_WINDOW_DAYS: usize = 30;

/// Public site that hosts published creator pages
pub const DEFAULT_PUBLISH_BASE_URL: &str = "https://ugcio.app";

/// Currency used for seeded rate-card items
pub const DEFAULT_CURRENCY: &str = "USD";
