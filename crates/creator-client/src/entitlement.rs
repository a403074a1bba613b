//! Trial and subscription resolution.
//!
//! [`EntitlementManager`] publishes the current [`EntitlementState`] through a
//! watch channel. A check ([`refresh`](EntitlementManager::refresh)) gathers
//! evidence from the oracle and the local trial clock, then applies its
//! result under the apply lock. Purchase and restore confirmations bump the
//! evidence sequence under the same lock, so a check that started before a
//! confirmation can never replace `Subscribed` with a trial state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::SecondsFormat;
use thiserror::Error;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use creator_shared::clock::Clock;
use creator_shared::constants::{DEFAULT_PRICE_LABEL, SUBSCRIPTION_KEY, TRIAL_START_KEY};
use creator_shared::entitlement::{parse_trial_start, resolve_trial};
use creator_shared::EntitlementState;
use creator_store::KvBackend;

use crate::oracle::{EntitlementOracle, OracleError, PurchaseOutcome, PurchaseRecord};

#[derive(Error, Debug)]
pub enum EntitlementError {
    /// Purchases are not possible on this device.
    #[error("Purchases are not available on this device")]
    Unavailable,

    /// Restore found no active subscription. Not a fault.
    #[error("No active subscription found")]
    NothingToRestore,

    #[error("Purchase failed: {0}")]
    Oracle(#[from] OracleError),
}

struct Resolution {
    state: EntitlementState,
    /// Value to persist for the cached subscribed flag, if the oracle
    /// actually answered.
    flag: Option<bool>,
}

#[derive(Default)]
struct Applied {
    last_check: u64,
}

pub struct EntitlementManager {
    oracle: Arc<dyn EntitlementOracle>,
    kv: Arc<dyn KvBackend>,
    clock: Arc<dyn Clock>,
    product_id: String,
    state: watch::Sender<EntitlementState>,
    price: watch::Sender<String>,
    checks_started: AtomicU64,
    evidence_seq: AtomicU64,
    apply: Mutex<Applied>,
}

impl EntitlementManager {
    pub fn new(
        oracle: Arc<dyn EntitlementOracle>,
        kv: Arc<dyn KvBackend>,
        clock: Arc<dyn Clock>,
        product_id: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(EntitlementState::Loading);
        let (price, _) = watch::channel(DEFAULT_PRICE_LABEL.to_string());
        Self {
            oracle,
            kv,
            clock,
            product_id: product_id.into(),
            state,
            price,
            checks_started: AtomicU64::new(0),
            evidence_seq: AtomicU64::new(0),
            apply: Mutex::new(Applied::default()),
        }
    }

    pub fn state(&self) -> EntitlementState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<EntitlementState> {
        self.state.subscribe()
    }

    /// Price shown on the paywall, e.g. `$9.99/month`.
    pub fn price_label(&self) -> String {
        self.price.borrow().clone()
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn purchases_available(&self) -> bool {
        self.oracle.is_available()
    }

    /// Run a full entitlement check and return the state in effect
    /// afterwards. Never fails and never leaves the state at `Loading`.
    pub async fn refresh(&self) -> EntitlementState {
        let check = self.checks_started.fetch_add(1, Ordering::SeqCst) + 1;
        let evidence = self.evidence_seq.load(Ordering::SeqCst);

        let resolution = self.resolve().await;

        let mut applied = self.apply.lock().await;
        if check < applied.last_check {
            debug!(check, "a newer check already applied, discarding result");
            return self.state();
        }
        if resolution.state != EntitlementState::Subscribed
            && self.evidence_seq.load(Ordering::SeqCst) != evidence
        {
            debug!(check, "subscription confirmed during check, discarding result");
            return self.state();
        }
        applied.last_check = check;

        if let Some(flag) = resolution.flag {
            self.write_flag(flag).await;
        }
        self.set_state(resolution.state);
        resolution.state
    }

    /// The app came back to the foreground. Entitlement may have changed
    /// while suspended, so everything is re-derived.
    pub async fn on_foreground(&self) -> EntitlementState {
        debug!("foreground, re-checking entitlement");
        self.refresh().await
    }

    /// Start a purchase. A user cancellation is not an error; completion may
    /// also arrive later through the purchase listener.
    pub async fn purchase(&self) -> Result<EntitlementState, EntitlementError> {
        if !self.oracle.is_available() {
            return Err(EntitlementError::Unavailable);
        }

        match self.oracle.initiate_purchase(&self.product_id).await? {
            PurchaseOutcome::Completed(record) => {
                self.handle_purchase_event(record).await?;
            }
            PurchaseOutcome::Pending => debug!("purchase pending, waiting for completion"),
            PurchaseOutcome::Cancelled => info!("purchase cancelled by user"),
        }
        Ok(self.state())
    }

    /// Query the oracle directly for an active subscription.
    pub async fn restore(&self) -> Result<EntitlementState, EntitlementError> {
        if !self.oracle.is_available() {
            return Err(EntitlementError::Unavailable);
        }

        let entries = self.oracle.query_active_entitlements(&self.product_id).await?;
        if !entries.iter().any(|e| e.product_id == self.product_id) {
            info!("restore found no active subscription");
            return Err(EntitlementError::NothingToRestore);
        }

        self.confirm_subscribed("restore").await;
        Ok(EntitlementState::Subscribed)
    }

    /// Apply a completed purchase. Returns `false` for other products.
    ///
    /// The transaction is acknowledged first; if that fails the state is left
    /// alone and the provider will deliver the purchase again.
    pub async fn handle_purchase_event(&self, record: PurchaseRecord) -> Result<bool, EntitlementError> {
        if record.product_id != self.product_id {
            debug!(product = %record.product_id, "ignoring purchase of another product");
            return Ok(false);
        }

        self.oracle.finish_transaction(&record).await?;
        self.confirm_subscribed("purchase").await;
        info!(transaction = %record.transaction_id, "purchase applied");
        Ok(true)
    }

    /// Apply every purchase the oracle pushes until its stream closes.
    pub fn spawn_purchase_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::clone(self);
        let mut rx = self.oracle.subscribe_purchases();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(record) => {
                        if let Err(e) = manager.handle_purchase_event(record).await {
                            warn!(error = %e, "could not apply purchase");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "purchase listener lagged, re-checking");
                        manager.refresh().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("purchase stream closed");
                        break;
                    }
                }
            }
        })
    }

    /// The cached flag is best-effort here as in every check: the
    /// confirmation has already taken effect when it is written.
    async fn confirm_subscribed(&self, source: &'static str) {
        let _applied = self.apply.lock().await;
        self.evidence_seq.fetch_add(1, Ordering::SeqCst);
        self.set_state(EntitlementState::Subscribed);
        info!(source, "subscription confirmed");
        self.write_flag(true).await;
    }

    async fn resolve(&self) -> Resolution {
        let cached = self.cached_flag().await;

        if !self.oracle.is_available() {
            if cached {
                return Resolution {
                    state: EntitlementState::Subscribed,
                    flag: None,
                };
            }
            return Resolution {
                state: self.trial_state().await,
                flag: None,
            };
        }

        self.refresh_price().await;

        match self.oracle.query_active_entitlements(&self.product_id).await {
            Ok(entries) if entries.iter().any(|e| e.product_id == self.product_id) => Resolution {
                state: EntitlementState::Subscribed,
                flag: Some(true),
            },
            Ok(_) => Resolution {
                state: self.trial_state().await,
                flag: Some(false),
            },
            Err(e) => {
                warn!(error = %e, cached, "entitlement query failed, using cached state");
                let state = if cached {
                    EntitlementState::Subscribed
                } else {
                    self.trial_state().await
                };
                Resolution { state, flag: None }
            }
        }
    }

    async fn cached_flag(&self) -> bool {
        match self.kv.read(SUBSCRIPTION_KEY).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "could not read cached subscription flag");
                false
            }
        }
    }

    async fn trial_state(&self) -> EntitlementState {
        let now = self.clock.now();
        match self.kv.read(TRIAL_START_KEY).await {
            Ok(Some(raw)) => match parse_trial_start(&raw) {
                Some(start) => resolve_trial(start, now),
                None => {
                    warn!(value = %raw, "unreadable trial start, treating trial as expired");
                    EntitlementState::TrialExpired
                }
            },
            Ok(None) => {
                let start = now.to_rfc3339_opts(SecondsFormat::Millis, true);
                match self.kv.write(TRIAL_START_KEY, &start).await {
                    Ok(()) => info!(%start, "trial started"),
                    Err(e) => warn!(error = %e, "could not persist trial start"),
                }
                resolve_trial(now, now)
            }
            Err(e) => {
                warn!(error = %e, "could not read trial start, assuming a fresh trial");
                resolve_trial(now, now)
            }
        }
    }

    async fn refresh_price(&self) {
        match self.oracle.fetch_product_info(&self.product_id).await {
            Ok(info) if !info.display_price.trim().is_empty() => {
                self.price.send_replace(format!("{}/month", info.display_price.trim()));
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "product info unavailable, keeping price label"),
        }
    }

    async fn write_flag(&self, subscribed: bool) {
        let value = if subscribed { "true" } else { "false" };
        if let Err(e) = self.kv.write(SUBSCRIPTION_KEY, value).await {
            warn!(error = %e, "could not persist subscription flag");
        }
    }

    fn set_state(&self, next: EntitlementState) {
        self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            info!(from = %current, to = %next, "entitlement changed");
            *current = next;
            true
        });
    }
}
