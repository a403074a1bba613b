//! Cached snapshot of one persisted collection.
//!
//! A [`CachedCollection`] loads its collection lazily from the backend, serves the cached
//! value afterwards and writes through on every mutation. The snapshot is
//! replaced only after the backend acknowledges the write. The cell's mutex
//! is held across the write, so read-modify-write cycles on one collection
//! never interleave.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, warn};

use creator_shared::constants::COLLECTION_KEY_PREFIX;

use crate::backend::KvBackend;
use crate::error::Result;

/// The independently persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Profile,
    Portfolio,
    Deliverables,
    Deals,
    Testimonials,
    Analytics,
    Invoices,
    Onboarded,
}

impl Collection {
    pub const ALL: [Collection; 8] = [
        Collection::Profile,
        Collection::Portfolio,
        Collection::Deliverables,
        Collection::Deals,
        Collection::Testimonials,
        Collection::Analytics,
        Collection::Invoices,
        Collection::Onboarded,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Portfolio => "portfolio",
            Self::Deliverables => "deliverables",
            Self::Deals => "deals",
            Self::Testimonials => "testimonials",
            Self::Analytics => "analytics",
            Self::Invoices => "invoices",
            Self::Onboarded => "onboarded",
        }
    }

    /// Durable key, always under [`COLLECTION_KEY_PREFIX`].
    pub fn storage_key(self) -> String {
        format!("{COLLECTION_KEY_PREFIX}{}", self.name())
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of a read-modify-write closure.
pub(crate) enum Change<T, R> {
    /// Persist the new value, then hand `R` back to the caller.
    Commit(T, R),
    /// Nothing to write.
    Keep(R),
}

pub(crate) struct CachedCollection<T> {
    collection: Collection,
    key: String,
    default: fn() -> T,
    slot: Mutex<Option<T>>,
    tx: watch::Sender<Option<T>>,
}

impl<T> CachedCollection<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(collection: Collection, default: fn() -> T) -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            collection,
            key: collection.storage_key(),
            default,
            slot: Mutex::new(None),
            tx,
        }
    }

    /// Current snapshot, loading it on first access.
    ///
    /// Never fails: a storage read fault yields the default without caching
    /// it, so the next call retries the read.
    pub async fn get(&self, backend: &dyn KvBackend) -> T {
        let mut slot = self.slot.lock().await;
        match self.ensure_loaded(&mut slot, backend).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    collection = %self.collection,
                    error = %e,
                    "storage read failed, serving default"
                );
                (self.default)()
            }
        }
    }

    /// Replace the whole collection.
    pub async fn mutate(&self, backend: &dyn KvBackend, value: T) -> Result<()> {
        let mut slot = self.slot.lock().await;
        self.commit(&mut slot, backend, value).await
    }

    /// Serialized read-modify-write.
    ///
    /// Unlike [`get`](Self::get), a read fault is surfaced here: computing a
    /// new value from the default would overwrite data that is merely
    /// unreadable.
    pub async fn update<R, F>(&self, backend: &dyn KvBackend, f: F) -> Result<R>
    where
        F: FnOnce(&T) -> Result<Change<T, R>>,
    {
        let mut slot = self.slot.lock().await;
        let current = self.ensure_loaded(&mut slot, backend).await?;
        match f(&current)? {
            Change::Commit(next, out) => {
                self.commit(&mut slot, backend, next).await?;
                Ok(out)
            }
            Change::Keep(out) => Ok(out),
        }
    }

    /// Receiver of every snapshot change. `None` means not loaded.
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    /// Exclusive access to the slot, used to quiesce the cell during a wipe.
    pub async fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.slot.lock().await
    }

    /// Drop the snapshot so the next access reloads from storage.
    pub fn invalidate(&self, slot: &mut Option<T>) {
        *slot = None;
        self.tx.send_replace(None);
    }

    async fn ensure_loaded(&self, slot: &mut Option<T>, backend: &dyn KvBackend) -> Result<T> {
        if let Some(value) = slot.as_ref() {
            return Ok(value.clone());
        }

        let value = match backend.read(&self.key).await? {
            None => {
                debug!(collection = %self.collection, "nothing persisted, using default");
                (self.default)()
            }
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(
                        collection = %self.collection,
                        error = %e,
                        "malformed persisted value, using default"
                    );
                    (self.default)()
                }
            },
        };

        *slot = Some(value.clone());
        self.tx.send_replace(Some(value.clone()));
        Ok(value)
    }

    async fn commit(&self, slot: &mut Option<T>, backend: &dyn KvBackend, value: T) -> Result<()> {
        let raw = serde_json::to_string(&value)?;
        if let Err(e) = backend.write(&self.key, &raw).await {
            warn!(collection = %self.collection, error = %e, "durable write failed");
            return Err(e);
        }

        debug!(collection = %self.collection, bytes = raw.len(), "collection written");
        *slot = Some(value.clone());
        self.tx.send_replace(Some(value));
        Ok(())
    }
}
