//! Workflow orchestration.
//!
//! [`Workflow`] binds one caller's session to the Fiscozen components and
//! exposes the operations the presentation layer needs. Each operation runs
//! under the configured step deadline. Authentication failures are surfaced,
//! never replayed: the caller logs in again and retries the step.

use std::future::Future;
use std::sync::Arc;

use fiscorelay_core::{
    ClientRecord, EventSink, Extraction, InvoiceDraft, InvoiceReceipt, NullSink, ResolutionSource,
    SearchResult, TransactionExtractor, WorkflowEvent,
};
use fiscorelay_fetch::HttpClient;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::auth::{Credentials, LoginOutcome, SessionEstablisher};
use super::client::AuthenticatedClient;
use super::customers::{CustomerResolver, Resolution};
use super::error::FiscozenError;
use super::extract::UNKNOWN_CLIENT;
use super::invoices::InvoiceComposer;
use super::lookup::{Location, LookupClient, VatValidation};
use super::sessions::{CallerKey, SessionManager};
use super::settings::FiscozenSettings;
use super::store::CredentialStore;

// ============================================================================
// Fiscozen API
// ============================================================================

/// Shared, caller-independent Fiscozen plumbing.
#[derive(Debug, Clone)]
pub struct FiscozenApi {
    http: HttpClient,
    settings: Arc<FiscozenSettings>,
    lookups: LookupClient,
}

impl FiscozenApi {
    /// Builds the HTTP clients for `settings`.
    pub fn new(settings: FiscozenSettings) -> Result<Self, FiscozenError> {
        let http = settings.http_client()?;
        let lookups = LookupClient::new(
            settings.lookup_http_client()?,
            settings.vies_url.clone(),
            settings.location_url.clone(),
        );
        Ok(Self {
            http,
            settings: Arc::new(settings),
            lookups,
        })
    }

    /// Returns the settings.
    pub fn settings(&self) -> &FiscozenSettings {
        &self.settings
    }

    /// Returns a session establisher.
    pub fn establisher(&self) -> SessionEstablisher {
        SessionEstablisher::new(self.http.clone(), Arc::clone(&self.settings))
    }

    /// Returns a request wrapper over `store`.
    pub fn authenticated(
        &self,
        store: Arc<CredentialStore>,
        sink: Arc<dyn EventSink>,
    ) -> AuthenticatedClient {
        AuthenticatedClient::new(self.http.clone(), Arc::clone(&self.settings), store, sink)
    }

    /// Returns the lookup client.
    pub fn lookups(&self) -> &LookupClient {
        &self.lookups
    }
}

// ============================================================================
// Process Outcome
// ============================================================================

/// Result of running a notification through the whole pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOutcome {
    /// What the extractor produced.
    pub extraction: Extraction,
    /// The client the invoice was issued to.
    pub client: ClientRecord,
    /// How the client was resolved.
    pub resolution: ResolutionSource,
    /// The created invoice.
    pub receipt: InvoiceReceipt,
}

// ============================================================================
// Workflow Builder
// ============================================================================

/// Builder for [`Workflow`].
pub struct WorkflowBuilder {
    settings: FiscozenSettings,
    sessions: Option<Arc<SessionManager>>,
    caller: CallerKey,
    sink: Arc<dyn EventSink>,
}

impl WorkflowBuilder {
    /// Shares an existing session manager.
    pub fn with_sessions(mut self, sessions: Arc<SessionManager>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Sets the caller whose session is used.
    pub fn with_caller(mut self, caller: impl Into<CallerKey>) -> Self {
        self.caller = caller.into();
        self
    }

    /// Sets the event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds the workflow.
    pub fn build(self) -> Result<Workflow, FiscozenError> {
        Ok(Workflow {
            api: Arc::new(FiscozenApi::new(self.settings)?),
            sessions: self.sessions.unwrap_or_default(),
            caller: self.caller,
            sink: self.sink,
        })
    }
}

// ============================================================================
// Workflow
// ============================================================================

/// One caller's view of the Fiscozen integration.
///
/// Cloning is cheap; clones share sessions and HTTP connections.
#[derive(Clone)]
pub struct Workflow {
    api: Arc<FiscozenApi>,
    sessions: Arc<SessionManager>,
    caller: CallerKey,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("base_url", &self.api.settings().base_url)
            .field("caller", &self.caller)
            .finish_non_exhaustive()
    }
}

impl Workflow {
    /// Starts building a workflow.
    pub fn builder(settings: FiscozenSettings) -> WorkflowBuilder {
        WorkflowBuilder {
            settings,
            sessions: None,
            caller: CallerKey::default(),
            sink: Arc::new(NullSink),
        }
    }

    /// Returns the same workflow bound to another caller.
    pub fn for_caller(&self, caller: impl Into<CallerKey>) -> Self {
        Self {
            caller: caller.into(),
            ..self.clone()
        }
    }

    /// Returns the caller key.
    pub fn caller(&self) -> &CallerKey {
        &self.caller
    }

    /// Returns the session manager.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Returns the shared API plumbing.
    pub fn api(&self) -> &FiscozenApi {
        &self.api
    }

    /// Returns true if the caller holds a valid session.
    pub fn is_authenticated(&self) -> bool {
        self.sessions.is_authenticated(&self.caller)
    }

    /// Drops the caller's session.
    pub fn logout(&self) -> bool {
        let cleared = self.sessions.logout(&self.caller);
        if cleared {
            self.sink.observe(&WorkflowEvent::SessionCleared {
                reason: "logout".to_string(),
            });
        }
        cleared
    }

    fn client(&self) -> AuthenticatedClient {
        self.api
            .authenticated(self.sessions.store(&self.caller), Arc::clone(&self.sink))
    }

    /// Runs `step` under the step deadline.
    async fn step<T>(
        &self,
        step: impl Future<Output = Result<T, FiscozenError>>,
    ) -> Result<T, FiscozenError> {
        let deadline = self.api.settings().step_timeout;
        tokio::time::timeout(deadline, step)
            .await
            .map_err(|_| FiscozenError::Timeout(deadline))?
    }

    /// Logs in. Concurrent logins for the same caller run one at a time.
    #[instrument(skip(self, credentials), fields(caller = %self.caller))]
    pub async fn login(&self, credentials: Credentials) -> Result<LoginOutcome, FiscozenError> {
        let lock = self.sessions.login_lock(&self.caller);
        let _guard = lock.lock().await;

        let store = self.sessions.store(&self.caller);
        let establisher = self.api.establisher();
        self.step(establisher.login(&credentials, &store, self.sink.as_ref()))
            .await
    }

    /// Searches provider customers by name.
    pub async fn search(
        &self,
        company_name: &str,
        tax_id: Option<&str>,
    ) -> Result<Vec<SearchResult>, FiscozenError> {
        let client = self.client();
        self.step(CustomerResolver::new(&client).search(company_name, tax_id))
            .await
    }

    /// Creates a provider customer and returns its id.
    pub async fn create_client(&self, record: &ClientRecord) -> Result<String, FiscozenError> {
        let client = self.client();
        self.step(CustomerResolver::new(&client).create(record)).await
    }

    /// Resolves a client to a provider customer, creating it if absent.
    pub async fn resolve_client(&self, record: ClientRecord) -> Result<Resolution, FiscozenError> {
        let client = self.client();
        self.step(CustomerResolver::new(&client).resolve_or_create(record))
            .await
    }

    /// Submits an invoice.
    ///
    /// A client without a provider id is looked up by legal name and the
    /// first match is used. With no match the call fails with
    /// [`FiscozenError::CustomerNotResolved`]; customers are never created
    /// implicitly here.
    #[instrument(skip(self, draft), fields(caller = %self.caller, client = %draft.client.legal_name))]
    pub async fn create_invoice(
        &self,
        mut draft: InvoiceDraft,
    ) -> Result<InvoiceReceipt, FiscozenError> {
        draft.validate()?;
        let client = self.client();

        self.step(async {
            if !draft.client.is_resolved() {
                client.session()?;
                debug!("Client has no provider id, searching");
                let found = CustomerResolver::new(&client)
                    .find_existing(&draft.client)
                    .await?
                    .ok_or_else(|| {
                        FiscozenError::CustomerNotResolved(draft.client.legal_name.clone())
                    })?;
                draft.client = found.merge_into(std::mem::take(&mut draft.client));
            }
            InvoiceComposer::new(&client).submit(&draft).await
        })
        .await
    }

    /// Runs a notification through extraction, resolution and invoicing.
    ///
    /// `client` replaces the extracted counterparty when given.
    #[instrument(skip(self, extractor, text, client), fields(caller = %self.caller, extractor = extractor.name()))]
    pub async fn process<E: TransactionExtractor>(
        &self,
        extractor: &E,
        text: &str,
        client: Option<ClientRecord>,
    ) -> Result<ProcessOutcome, FiscozenError> {
        self.client().session()?;

        let mut extraction = extractor.extract(text).await?;
        if let Some(client) = client {
            extraction.client = client;
        }
        if extraction.client.legal_name.trim() == UNKNOWN_CLIENT {
            return Err(FiscozenError::InvalidInput(
                "Client could not be identified from the text; name the client explicitly"
                    .to_string(),
            ));
        }
        info!(
            amount = %extraction.transaction.amount,
            currency = %extraction.transaction.currency,
            "Transaction extracted"
        );

        let mut draft = extraction.clone().into_draft();
        draft.validate()?;

        let resolution = self.resolve_client(draft.client).await?;
        draft.client = resolution.client.clone();

        let receipt = self.create_invoice(draft).await?;
        Ok(ProcessOutcome {
            extraction,
            client: resolution.client,
            resolution: resolution.source,
            receipt,
        })
    }

    /// Checks an Italian VAT number.
    pub async fn validate_vat(&self, vat: &str) -> Result<VatValidation, FiscozenError> {
        self.step(self.api.lookups().validate_vat(vat, self.sink.as_ref()))
            .await
    }

    /// Resolves an Italian postal code.
    pub async fn lookup_location(&self, cap: &str) -> Result<Location, FiscozenError> {
        self.step(self.api.lookups().lookup_location(cap, self.sink.as_ref()))
            .await
    }
}
