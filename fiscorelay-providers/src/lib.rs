// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Fiscorelay Providers
//!
//! Billing provider integrations for Fiscorelay.
//!
//! Each provider module owns the whole conversation with one billing
//! platform:
//!
//! - **Session**: how credentials become a usable session, and where it lives
//! - **Requests**: how stored credentials are attached to outbound calls
//! - **Resolution**: how a local client becomes a provider customer id
//! - **Composition**: how a generic invoice maps onto the provider schema
//!
//! ## Supported Providers
//!
//! | Provider | Auth | Customers | Invoices | Lookups |
//! |----------|------|-----------|----------|---------|
//! | Fiscozen | Cookie + CSRF | Search / Create | Create | VIES, postal codes |
//!
//! ## Usage
//!
//! ```ignore
//! use fiscorelay_providers::fiscozen::{Credentials, FiscozenSettings, Workflow};
//!
//! let workflow = Workflow::builder(FiscozenSettings::default()).build()?;
//! workflow.login(Credentials::new("a@b.com", "secret")).await?;
//!
//! let matches = workflow.search("Acme Srl", None).await?;
//! println!("{} matches", matches.len());
//! ```

pub mod fiscozen;

// Re-export the entry points
pub use fiscozen::{
    CallerKey, CredentialStore, Credentials, FiscozenError, FiscozenSettings, SessionManager,
    Workflow,
};
