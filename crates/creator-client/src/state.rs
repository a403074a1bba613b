//! Application state shared by every UI surface.
//!
//! [`App`] wires the store, the entitlement manager and the navigation gate
//! over one durable backend. UI shells hold it behind an `Arc` and call into
//! it from their event handlers.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use creator_shared::clock::{Clock, SystemClock};
use creator_shared::insights::{PipelineSummary, ProfileCompletion};
use creator_shared::EntitlementState;
use creator_store::{CreatorStore, Database, KvBackend, StoreError};

use crate::config::ClientConfig;
use crate::entitlement::EntitlementManager;
use crate::gate::{Gate, Route};
use crate::oracle::{select_oracle, EntitlementOracle};
use crate::publish::{PublishClient, PublishError, PublishStep};

/// One-screen summary of the app.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStatus {
    pub onboarded: bool,
    pub entitlement: EntitlementState,
    pub price_label: String,
    pub route: Route,
    pub profile_percent: u8,
    pub next_steps: Vec<&'static str>,
    pub pipeline: PipelineSummary,
    pub portfolio_items: usize,
    pub invoices: usize,
}

pub struct App {
    config: ClientConfig,
    store: Arc<CreatorStore>,
    entitlement: Arc<EntitlementManager>,
    gate: Mutex<Gate>,
    publisher: Option<PublishClient>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl App {
    /// Open the on-device database named by `config` and build the app.
    pub fn open(
        config: ClientConfig,
        oracle: Option<Arc<dyn EntitlementOracle>>,
    ) -> Result<Self, StoreError> {
        let db = match &config.data_dir {
            Some(dir) => Database::open_in_dir(dir)?,
            None => Database::new()?,
        };
        Ok(Self::with_backend(config, Arc::new(db), oracle, Arc::new(SystemClock)))
    }

    pub fn with_backend(
        config: ClientConfig,
        backend: Arc<dyn KvBackend>,
        oracle: Option<Arc<dyn EntitlementOracle>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let oracle = select_oracle(oracle, config.platform);
        let store = Arc::new(CreatorStore::with_clock(backend.clone(), clock.clone()));
        let entitlement = Arc::new(EntitlementManager::new(
            oracle,
            backend,
            clock,
            config.product_id.clone(),
        ));

        let publisher = match &config.publish_api_key {
            Some(key) => match PublishClient::new(&config.publish_base_url, key) {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "could not build publish client");
                    None
                }
            },
            None => None,
        };

        Self {
            config,
            store,
            entitlement,
            gate: Mutex::new(Gate::new()),
            publisher,
            listener: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<CreatorStore> {
        &self.store
    }

    pub fn entitlement(&self) -> &Arc<EntitlementManager> {
        &self.entitlement
    }

    fn gate(&self) -> MutexGuard<'_, Gate> {
        self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start listening for purchases and run the first entitlement check.
    pub async fn start(&self) -> Route {
        {
            let mut listener = self.listener.lock().unwrap_or_else(|e| e.into_inner());
            if listener.is_none() {
                *listener = Some(self.entitlement.spawn_purchase_listener());
            }
        }

        let state = self.entitlement.refresh().await;
        info!(%state, platform = %self.config.platform, "app started");
        self.route().await
    }

    pub async fn on_foreground(&self) -> Route {
        self.entitlement.on_foreground().await;
        self.route().await
    }

    pub async fn route(&self) -> Route {
        let onboarded = self.store.has_onboarded().await;
        let mut gate = self.gate();
        gate.observe_onboarded(Some(onboarded));
        gate.route(self.entitlement.state())
    }

    /// The navigation the UI should perform now, if any.
    pub async fn next_redirect(&self) -> Option<Route> {
        let onboarded = self.store.has_onboarded().await;
        let mut gate = self.gate();
        gate.observe_onboarded(Some(onboarded));
        gate.next_redirect(self.entitlement.state())
    }

    pub fn begin_onboarding(&self) {
        self.gate().begin_onboarding();
    }

    pub async fn complete_onboarding(&self) -> Result<(), StoreError> {
        self.store.complete_onboarding().await?;
        self.gate().finish_onboarding();
        Ok(())
    }

    /// Send the creator back through onboarding.
    pub async fn reset_onboarding(&self) -> Result<(), StoreError> {
        self.store.reset_onboarding().await?;
        self.gate().reset();
        Ok(())
    }

    /// Erase all creator data. Trial and subscription state are kept.
    pub async fn wipe(&self) -> Result<(), StoreError> {
        let result = self.store.wipe().await;
        self.gate().reset();
        result
    }

    pub async fn publish(&self, progress: impl FnMut(PublishStep)) -> Result<String, PublishError> {
        let publisher = self.publisher.as_ref().ok_or(PublishError::NotConfigured)?;
        let snapshot = self.store.publish_snapshot().await;
        publisher.publish(&snapshot, progress).await
    }

    pub async fn status(&self) -> AppStatus {
        let profile = self.store.profile().await;
        let portfolio = self.store.portfolio().await;
        let deliverables = self.store.deliverables().await;
        let completion = ProfileCompletion::evaluate(&profile, &portfolio, &deliverables);

        AppStatus {
            onboarded: self.store.has_onboarded().await,
            entitlement: self.entitlement.state(),
            price_label: self.entitlement.price_label(),
            route: self.route().await,
            profile_percent: completion.percent(),
            next_steps: completion.next_steps(),
            pipeline: self.store.pipeline_summary().await,
            portfolio_items: portfolio.len(),
            invoices: self.store.invoices().await.len(),
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let listener = self.listener.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = listener.take() {
            handle.abort();
        }
    }
}
