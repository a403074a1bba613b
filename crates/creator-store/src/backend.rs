//! Durable key-value storage seam.
//!
//! Every collection lives under one key; values are the collection's JSON
//! form. [`Database`](crate::Database) is the on-device implementation,
//! [`MemoryBackend`] backs tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Result, StoreError};

#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read a value. `Ok(None)` means the key was never written.
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Write a value. The write is durable once this returns `Ok`.
    async fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove every key starting with `prefix`. An empty prefix clears all.
    async fn clear(&self, prefix: &str) -> Result<()>;
}

/// Process-local backend with fault injection.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail until turned off again.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write and clear fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Seed a raw value, bypassing serialization.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        tokio::task::yield_now().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read rejected".into()));
        }
        Ok(self.raw(key))
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        // Suspend like a real device write so concurrent callers interleave.
        tokio::task::yield_now().await;
        self.check_writable()?;
        self.insert_raw(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self, prefix: &str) -> Result<()> {
        tokio::task::yield_now().await;
        self.check_writable()?;
        self.lock().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clear_only_touches_prefix() {
        let backend = MemoryBackend::new();
        backend.write("creator_deals", "[]").await.unwrap();
        backend.write("ugcio_trial_start", "x").await.unwrap();

        backend.clear("creator_").await.unwrap();

        assert_eq!(backend.read("creator_deals").await.unwrap(), None);
        assert_eq!(
            backend.read("ugcio_trial_start").await.unwrap().as_deref(),
            Some("x")
        );
    }

    #[tokio::test]
    async fn test_injected_write_failure_leaves_value() {
        let backend = MemoryBackend::new();
        backend.write("k", "1").await.unwrap();
        backend.set_fail_writes(true);

        let err = backend.write("k", "2").await.unwrap_err();
        assert!(err.is_storage_fault());
        assert_eq!(backend.raw("k").as_deref(), Some("1"));
        assert_eq!(backend.write_count(), 1);
    }
}
