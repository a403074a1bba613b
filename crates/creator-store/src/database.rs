//! SQLite-backed durable storage.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. Collections are stored as
//! JSON text in a single `kv_store` table, one row per key.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};

use crate::backend::KvBackend;
use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
///
/// The connection is synchronous; every statement runs on the blocking pool
/// via `spawn_blocking` while holding the connection lock.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) the database in the platform data directory:
    /// - Linux:   `~/.local/share/creator/creator.db`
    /// - macOS:   `~/Library/Application Support/app.ugcio.creator/creator.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\ugcio\creator\data\creator.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("app", "ugcio", "creator").ok_or(StoreError::NoDataDir)?;
        Self::open_in_dir(project_dirs.data_dir())
    }

    /// Open (or create) `creator.db` inside `dir`, creating the directory.
    pub fn open_in_dir(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let db_path = dir.join("creator.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A private database that disappears with the handle.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }

    /// Filesystem path of the open database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| StoreError::Backend(format!("connection lock poisoned: {e}")))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("storage task failed: {e}")))?
    }
}

#[async_trait]
impl KvBackend for Database {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_store WHERE key = ?1",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?;
            Ok(value)
        })
        .await
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    async fn clear(&self, prefix: &str) -> Result<()> {
        let prefix = prefix.to_string();
        self.with_conn(move |conn| {
            // substr instead of LIKE: `_` in prefixes is a LIKE wildcard
            let removed = conn.execute(
                "DELETE FROM kv_store WHERE substr(key, 1, length(?1)) = ?1",
                params![prefix],
            )?;
            tracing::info!(prefix = %prefix, removed, "cleared durable keys");
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let db = Database::open_at(&path).expect("should open");
            assert_eq!(db.path(), Some(path.as_path()));
            db.write("creator_onboarded", "true").await.unwrap();
        }

        let db = Database::open_at(&path).expect("should reopen");
        assert_eq!(
            db.read("creator_onboarded").await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_overwrite_and_missing_keys() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.read("creator_deals").await.unwrap(), None);

        db.write("creator_deals", "[]").await.unwrap();
        db.write("creator_deals", "[1]").await.unwrap();
        assert_eq!(db.read("creator_deals").await.unwrap().as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn test_clear_respects_prefix_literally() {
        let db = Database::open_in_memory().unwrap();
        db.write("creator_profile", "{}").await.unwrap();
        db.write("creatorXprofile", "{}").await.unwrap();
        db.write("ugcio_trial_start", "2025-01-01T00:00:00Z").await.unwrap();

        db.clear("creator_").await.unwrap();

        assert_eq!(db.read("creator_profile").await.unwrap(), None);
        assert_eq!(db.read("creatorXprofile").await.unwrap().as_deref(), Some("{}"));
        assert!(db.read("ugcio_trial_start").await.unwrap().is_some());
    }

    #[test]
    fn test_open_in_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let db = Database::open_in_dir(&nested).unwrap();
        assert!(nested.join("creator.db").exists());
        assert!(db.path().is_some());
    }
}
