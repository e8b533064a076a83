//! Core error types for Fiscorelay.

use thiserror::Error;

/// Core error type for Fiscorelay operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An invoice draft has no line items.
    #[error("Invoice requires at least one line item")]
    MissingLineItems,

    /// An invoice draft has no client legal name.
    #[error("Invoice requires a client with a legal name")]
    MissingClient,

    /// A row or invoice total does not fit in a decimal.
    #[error("Invoice amount is out of range")]
    AmountOverflow,

    /// Invalid data in a model.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Text extraction failed.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
