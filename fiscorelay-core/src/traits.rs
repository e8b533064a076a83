//! Trait definitions for Fiscorelay.
//!
//! This module defines the seams the workflow consumes as black boxes.

use crate::error::CoreError;
use crate::models::Extraction;

/// Turns a free-text payment notification into structured data.
///
/// Implementors may call an LLM or fall back to pattern matching; the
/// workflow only sees the resulting [`Extraction`] or an error.
pub trait TransactionExtractor: Send + Sync {
    /// Returns a short name for logs.
    fn name(&self) -> &str;

    /// Extracts a transaction and its counterparty from `text`.
    fn extract(
        &self,
        text: &str,
    ) -> impl std::future::Future<Output = Result<Extraction, CoreError>> + Send;
}
