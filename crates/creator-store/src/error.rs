use creator_shared::ValidationError;
use thiserror::Error;

use crate::collection::Collection;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to determine a platform data directory.
    #[error("Could not determine application data directory")]
    NoDataDir,

    /// Generic I/O error (e.g. creating the database directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration failure.
    #[error("Migration error: {0}")]
    Migration(String),

    /// A collection value could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other durable-storage failure reported by a backend.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// The caller supplied an out-of-contract value. Nothing was written.
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A caller-supplied JSON value does not have the collection's shape.
    #[error("Value does not fit {collection}: {source}")]
    Shape {
        collection: Collection,
        source: serde_json::Error,
    },

    /// An update-by-id named a record that does not exist.
    #[error("No {collection} record with id {id}")]
    NotFound { collection: Collection, id: String },
}

impl StoreError {
    /// Durable storage could not be read or written.
    pub fn is_storage_fault(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(_)
                | Self::NoDataDir
                | Self::Io(_)
                | Self::Migration(_)
                | Self::Serialization(_)
                | Self::Backend(_)
        )
    }

    /// The operation was refused before touching storage.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Shape { .. } | Self::NotFound { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
