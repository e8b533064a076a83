// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Fiscorelay Core
//!
//! Core types, models, and traits shared by every Fiscorelay crate.
//!
//! This crate holds no I/O. It provides:
//!
//! - Domain models (clients, invoice drafts, search results, sessions)
//! - Error types
//! - The workflow observation model ([`WorkflowEvent`], [`EventSink`])
//! - The extraction seam ([`TransactionExtractor`])
//!
//! ## Key Types
//!
//! ### Billing Types
//! - [`ClientRecord`] - A customer as known locally, optionally linked to a provider id
//! - [`InvoiceDraft`] - A generic line-item invoice awaiting submission
//! - [`LineItem`] - One billable row
//! - [`InvoiceReceipt`] - What the provider returned for a created invoice
//!
//! ### Provider Types
//! - [`ProviderSession`] - Cookie/CSRF credentials for the provider's web API
//! - [`SearchResult`] - Read projection of a provider-side customer
//!
//! ### Extraction
//! - [`TransactionData`] - Structured payment data pulled from free text
//! - [`Extraction`] - Transaction plus counterparty

pub mod error;
pub mod events;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export observation types
pub use events::{
    mask_email, truncate_secret, EventLevel, EventSink, LoginMethod, NullSink, ResolutionSource,
    WorkflowEvent,
};

// Re-export all model types
pub use models::{
    // Billing types
    ClientRecord,
    InvoiceDraft,
    InvoiceReceipt,
    LineItem,
    // Provider types
    ProviderSession,
    SearchResult,
    // Extraction
    Extraction,
    TransactionData,
    // Defaults
    DEFAULT_CURRENCY,
    DEFAULT_SESSION_TTL_HOURS,
};

// Re-export traits
pub use traits::TransactionExtractor;
