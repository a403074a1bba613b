use thiserror::Error;

/// A caller supplied a value outside the contract of a collection.
///
/// Raised before any durable write is attempted, so a validation failure
/// never leaves a partial write behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("price must be a finite non-negative number, got {0}")]
    InvalidPrice(f64),

    #[error("budget must be a finite non-negative number, got {0}")]
    InvalidBudget(f64),

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    #[error("username {0:?} is not a lowercase slug of [a-z0-9_-]")]
    UnnormalizedUsername(String),

    #[error("invoice total {got} does not match its line items ({expected})")]
    TotalMismatch { expected: f64, got: f64 },

    #[error("{days} day buckets exceed the {max}-day window")]
    WindowExceeded { days: usize, max: usize },

    #[error("duplicate id in {collection}: {id}")]
    DuplicateId { collection: &'static str, id: String },
}
