//! # creator-store
//!
//! Durable, cached storage for every creator collection.
//!
//! Each collection is persisted as JSON under its own key in a [`KvBackend`].
//! [`CreatorStore`] keeps one in-memory snapshot per collection, writes
//! through on every mutation and serializes mutations per collection. The
//! on-device backend is [`Database`], a single SQLite table.

pub mod backend;
pub mod collection;
pub mod database;
pub mod migrations;
pub mod store;

mod analytics;
mod deals;
mod deliverables;
mod error;
mod invoices;
mod onboarding;
mod portfolio;
mod profile;
mod testimonials;

pub use backend::{KvBackend, MemoryBackend};
pub use collection::Collection;
pub use database::Database;
pub use error::{Result, StoreError};
pub use store::{CreatorStore, PublishSnapshot};
