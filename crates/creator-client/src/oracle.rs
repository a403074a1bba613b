//! Purchase oracle seam.
//!
//! The billing SDK of the host platform is wrapped by the UI shell in an
//! [`EntitlementOracle`] implementation and handed to the core at startup.
//! [`select_oracle`] decides once which oracle the app runs with; platforms
//! without billing get [`UnavailableOracle`] and run in trial-only mode.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use creator_shared::types::Platform;

/// Failure reported by the billing provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Purchase module is not available on this device")]
    Unavailable,

    #[error("Could not reach the store: {0}")]
    Network(String),

    #[error("Billing error: {0}")]
    Billing(String),
}

/// One active entitlement reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEntry {
    pub product_id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A completed purchase, either returned by
/// [`EntitlementOracle::initiate_purchase`] or pushed to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub product_id: String,
    pub transaction_id: String,
    pub purchased_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Completed(PurchaseRecord),
    /// The purchase sheet was accepted; completion arrives through
    /// [`EntitlementOracle::subscribe_purchases`].
    Pending,
    /// The user dismissed the purchase sheet.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub product_id: String,
    /// Localized price without the billing period, e.g. `$9.99`.
    pub display_price: String,
}

#[async_trait]
pub trait EntitlementOracle: Send + Sync {
    /// Whether the provider initialized and can be queried.
    fn is_available(&self) -> bool;

    async fn query_active_entitlements(
        &self,
        product_id: &str,
    ) -> Result<Vec<ActiveEntry>, OracleError>;

    async fn initiate_purchase(&self, product_id: &str) -> Result<PurchaseOutcome, OracleError>;

    /// Purchase-completed notifications. Completions may arrive after
    /// [`initiate_purchase`](Self::initiate_purchase) has returned, or
    /// without any call at all (e.g. a deferred approval).
    fn subscribe_purchases(&self) -> broadcast::Receiver<PurchaseRecord>;

    /// Acknowledge a delivered purchase so the provider stops redelivering it.
    async fn finish_transaction(&self, record: &PurchaseRecord) -> Result<(), OracleError>;

    async fn fetch_product_info(&self, product_id: &str) -> Result<ProductInfo, OracleError>;
}

/// Oracle for platforms without a purchase module. Every call fails with
/// [`OracleError::Unavailable`] and no purchase is ever delivered.
pub struct UnavailableOracle {
    // Kept alive so subscribers park instead of seeing a closed channel.
    purchases: broadcast::Sender<PurchaseRecord>,
}

impl UnavailableOracle {
    pub fn new() -> Self {
        let (purchases, _) = broadcast::channel(1);
        Self { purchases }
    }
}

impl Default for UnavailableOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntitlementOracle for UnavailableOracle {
    fn is_available(&self) -> bool {
        false
    }

    async fn query_active_entitlements(&self, _: &str) -> Result<Vec<ActiveEntry>, OracleError> {
        Err(OracleError::Unavailable)
    }

    async fn initiate_purchase(&self, _: &str) -> Result<PurchaseOutcome, OracleError> {
        Err(OracleError::Unavailable)
    }

    fn subscribe_purchases(&self) -> broadcast::Receiver<PurchaseRecord> {
        self.purchases.subscribe()
    }

    async fn finish_transaction(&self, _: &PurchaseRecord) -> Result<(), OracleError> {
        Err(OracleError::Unavailable)
    }

    async fn fetch_product_info(&self, _: &str) -> Result<ProductInfo, OracleError> {
        Err(OracleError::Unavailable)
    }
}

/// Pick the oracle for this process.
///
/// The web build never has billing; a native candidate that failed to
/// initialize is replaced as well.
pub fn select_oracle(
    candidate: Option<Arc<dyn EntitlementOracle>>,
    platform: Platform,
) -> Arc<dyn EntitlementOracle> {
    match (platform, candidate) {
        (Platform::Native, Some(oracle)) if oracle.is_available() => {
            info!("purchase oracle available");
            oracle
        }
        (Platform::Native, Some(_)) => {
            warn!("purchase module failed to initialize, running trial-only");
            Arc::new(UnavailableOracle::new())
        }
        (Platform::Native, None) => {
            warn!("no purchase module registered, running trial-only");
            Arc::new(UnavailableOracle::new())
        }
        (Platform::Web, _) => {
            info!("web platform, running trial-only");
            Arc::new(UnavailableOracle::new())
        }
    }
}
