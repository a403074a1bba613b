//! # creator-shared
//!
//! Domain types shared by the store and the app core: the records of every
//! persisted collection, validation rules, trial math and derived views.
//! Nothing in this crate performs I/O.

pub mod clock;
pub mod constants;
pub mod entitlement;
pub mod error;
pub mod insights;
pub mod models;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entitlement::EntitlementState;
pub use error::ValidationError;
pub use models::*;
