//! Domain models for Fiscorelay.
//!
//! All entities are transient and request-scoped except
//! [`ProviderSession`], which lives as long as its owning session store.
//!
//! ## Submodules
//!
//! - [`client`] - Client types (ClientRecord, SearchResult)
//! - [`invoice`] - Invoice types (InvoiceDraft, LineItem, InvoiceReceipt)
//! - [`session`] - Provider session credentials
//! - [`transaction`] - Extraction output (TransactionData, Extraction)

mod client;
mod invoice;
mod session;
mod transaction;

// Re-export everything at the models level
pub use client::{ClientRecord, SearchResult};
pub use invoice::{InvoiceDraft, InvoiceReceipt, LineItem, DEFAULT_CURRENCY};
pub use session::{ProviderSession, DEFAULT_SESSION_TTL_HOURS};
pub use transaction::{Extraction, TransactionData};
#[cfg(test)]
mod serde_tests;
