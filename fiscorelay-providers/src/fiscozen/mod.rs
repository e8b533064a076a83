//! Fiscozen provider implementation.
//!
//! Fiscozen is an Italian invoicing platform for flat-rate freelancers. It
//! offers no public API; its web app talks to a private JSON API protected
//! by session cookies and a CSRF token.
//!
//! ## Components
//!
//! 1. **Credential Store** ([`CredentialStore`]): one session slot per caller,
//!    owned by the [`SessionManager`]
//! 2. **Session Establisher** ([`SessionEstablisher`]): CSRF bootstrap and
//!    login handshake
//! 3. **Authenticated Request Wrapper** ([`AuthenticatedClient`]): attaches
//!    cookies and CSRF headers, clears the session on 401
//! 4. **Customer Resolver** ([`CustomerResolver`]): search, then create if absent
//! 5. **Invoice Composer** ([`InvoiceComposer`]): maps drafts to the provider
//!    schema and submits them
//!
//! [`Workflow`] ties these together for one caller.
//!
//! ## Endpoints
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET | `/`, `/auth/login/`, `/login/`, `/accounts/login/` | CSRF cookie |
//! | POST | `/api/v1/auth/login/` | Login |
//! | GET | `/api/v1/customers/?search=&page=1&page_size=25` | Search |
//! | GET | `/api/v1/customers/{id}/?invoice_date=` | Customer detail |
//! | POST | `/api/v1/customers/` | Create customer |
//! | POST | `/api/v1/invoices/` | Create invoice |
//!
//! ## Usage
//!
//! ```ignore
//! use fiscorelay_providers::fiscozen::{Credentials, FiscozenSettings, Workflow};
//!
//! let workflow = Workflow::builder(FiscozenSettings::default()).build()?;
//! workflow.login(Credentials::new("a@b.com", "secret")).await?;
//! let receipt = workflow.create_invoice(draft).await?;
//! ```

// Modules
mod auth;
mod client;
mod customers;
mod error;
mod extract;
mod invoices;
mod lookup;
mod observe;
pub(crate) mod parser;
mod sessions;
mod settings;
mod store;
mod workflow;


// Re-exports
pub use auth::{Credentials, LoginOutcome, SessionEstablisher, CSRF_COOKIE};
pub use client::{AuthenticatedClient, ProviderResponse};
pub use customers::{CreateCustomerPayload, CustomerResolver, Resolution, ResolutionState};
pub use error::FiscozenError;
pub use extract::{RegexExtractor, UNKNOWN_CLIENT};
pub use invoices::{ExemptionProfile, InvoiceComposer, InvoicePayload, InvoiceRow};
pub use lookup::{normalize_vat, Location, LookupClient, VatValidation};
pub use observe::{FanoutSink, RecordingSink, TracingSink};
pub use parser::{parse_invoice_receipt, parse_search_response, provider_message};
pub use sessions::{CallerKey, SessionManager, DEFAULT_CALLER};
pub use settings::{
    FiscozenSettings, CSRF_HEADER, CUSTOMERS_ENDPOINT, DEFAULT_BASE_URL, DEFAULT_LANDING_PATHS,
    INVOICES_ENDPOINT, LOGIN_ENDPOINT,
};
pub use store::CredentialStore;
pub use workflow::{FiscozenApi, ProcessOutcome, Workflow, WorkflowBuilder};
